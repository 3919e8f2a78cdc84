use super::*;
use crate::provider::GeneratedImage;
use std::sync::Mutex;

// =========================================================================
// MockProvider
// =========================================================================

enum Reply {
    Text(&'static str),
    Fail(ProviderError),
    Hang,
}

struct MockProvider {
    text: Mutex<Vec<Reply>>,
    image: Mutex<Vec<Reply>>,
    prompts: Mutex<Vec<(String, bool)>>,
}

impl MockProvider {
    fn new(text: Vec<Reply>, image: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self { text: Mutex::new(text), image: Mutex::new(image), prompts: Mutex::new(Vec::new()) })
    }
}

async fn play(reply: Reply) -> Result<String, ProviderError> {
    match reply {
        Reply::Text(t) => Ok(t.to_string()),
        Reply::Fail(e) => Err(e),
        Reply::Hang => {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(String::new())
        }
    }
}

#[async_trait::async_trait]
impl Provider for MockProvider {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, ProviderError> {
        self.prompts
            .lock()
            .unwrap()
            .push((request.prompt.to_string(), request.schema.is_some()));
        let reply = self.text.lock().unwrap().remove(0);
        play(reply).await
    }

    async fn generate_image(&self, _prompt: &str) -> Result<GeneratedImage, ProviderError> {
        let reply = self.image.lock().unwrap().remove(0);
        play(reply)
            .await
            .map(|base64| GeneratedImage { mime_type: "image/jpeg".into(), base64 })
    }
}

fn card(name: &str) -> CardPrompt {
    CardPrompt { name: name.into(), description: format!("{name} imagery"), message: Some(format!("{name} meaning")) }
}

fn gateway(mock: Arc<MockProvider>) -> GenerationGateway {
    GenerationGateway::new(Some(mock as Arc<dyn Provider>), GatewayTimeouts::default())
}

// =========================================================================
// generate_text
// =========================================================================

#[tokio::test]
async fn single_returns_one_trimmed_message() {
    let mock = MockProvider::new(vec![Reply::Text("  Trust the light.\n")], vec![]);
    let gw = gateway(mock.clone());
    let messages = gw
        .generate_text(&MessageRequest::Single(card("The Lantern")))
        .await
        .unwrap();
    assert_eq!(messages, vec!["Trust the light.".to_string()]);

    let prompts = mock.prompts.lock().unwrap();
    assert!(prompts[0].0.contains("The Lantern"));
    assert!(prompts[0].0.contains("The Lantern imagery"));
    assert!(prompts[0].0.contains("The Lantern meaning"));
    assert!(!prompts[0].1, "single mode asks for free text");
}

#[tokio::test]
async fn three_decodes_structured_response_in_order() {
    let mock = MockProvider::new(
        vec![Reply::Text(r#"{"future":"F","past":"P","present":"N"}"#)],
        vec![],
    );
    let gw = gateway(mock.clone());
    let messages = gw
        .generate_text(&MessageRequest::Three([card("A"), card("B"), card("C")]))
        .await
        .unwrap();
    assert_eq!(messages, vec!["P", "N", "F"]);
    assert!(mock.prompts.lock().unwrap()[0].1, "three mode asks for structured output");
}

#[tokio::test]
async fn three_malformed_response_is_generation_error() {
    let mock = MockProvider::new(vec![Reply::Text(r#"{"past":"P","present":"N"}"#)], vec![]);
    let err = gateway(mock)
        .generate_text(&MessageRequest::Three([card("A"), card("B"), card("C")]))
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::Malformed(_)));
}

#[tokio::test]
async fn single_empty_completion_is_malformed() {
    let mock = MockProvider::new(vec![Reply::Text("   ")], vec![]);
    let err = gateway(mock)
        .generate_text(&MessageRequest::Single(card("A")))
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::Malformed(_)));
}

#[tokio::test]
async fn unconfigured_provider_is_auth_error() {
    let gw = GenerationGateway::new(None, GatewayTimeouts::default());
    assert!(!gw.is_configured());
    let err = gw
        .generate_text(&MessageRequest::Single(card("A")))
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::Auth(_)));
    assert_eq!(err.public_message(), "Service temporarily unavailable");
    assert!(matches!(gw.generate_image("x").await, Err(GenerationError::Auth(_))));
}

#[tokio::test]
async fn provider_quota_error_is_classified() {
    let mock = MockProvider::new(
        vec![Reply::Fail(ProviderError::ApiResponse { status: 429, body: "RESOURCE_EXHAUSTED".into() })],
        vec![],
    );
    let err = gateway(mock)
        .generate_text(&MessageRequest::Single(card("A")))
        .await
        .unwrap_err();
    assert_eq!(err, GenerationError::Quota("status 429".into()));
}

fn impatient(mock: Arc<MockProvider>) -> GenerationGateway {
    let timeouts = GatewayTimeouts { text: Duration::from_millis(20), image: Duration::from_millis(40) };
    GenerationGateway::new(Some(mock as Arc<dyn Provider>), timeouts)
}

#[tokio::test]
async fn text_timeout_is_distinct_from_provider_error() {
    let mock = MockProvider::new(vec![Reply::Hang], vec![]);
    let err = impatient(mock)
        .generate_text(&MessageRequest::Single(card("A")))
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::Timeout { .. }));
    assert_eq!(err.error_code(), "E_TIMEOUT");
}

// =========================================================================
// generate_image
// =========================================================================

#[tokio::test]
async fn image_returns_data_uri() {
    let mock = MockProvider::new(vec![], vec![Reply::Text("QUJD")]);
    let uri = gateway(mock).generate_image("a lantern").await.unwrap();
    assert_eq!(uri, "data:image/jpeg;base64,QUJD");
}

#[tokio::test]
async fn slow_image_times_out() {
    let mock = MockProvider::new(vec![], vec![Reply::Hang]);
    let err = impatient(mock).generate_image("a lantern").await.unwrap_err();
    assert!(matches!(err, GenerationError::Timeout { .. }));
}

#[test]
fn default_timeouts() {
    let t = GatewayTimeouts::default();
    assert_eq!(t.text.as_secs(), DEFAULT_TEXT_TIMEOUT_SECS);
    assert_eq!(t.image.as_secs(), DEFAULT_IMAGE_TIMEOUT_SECS);
}

// =========================================================================
// classify / decode
// =========================================================================

#[test]
fn classify_covers_taxonomy() {
    let auth = classify(ProviderError::ApiResponse { status: 400, body: "API key not valid.".into() });
    assert!(matches!(auth, GenerationError::Auth(_)));
    assert!(matches!(classify(ProviderError::ApiResponse { status: 401, body: String::new() }), GenerationError::Auth(_)));
    assert!(matches!(
        classify(ProviderError::ApiResponse { status: 403, body: "PERMISSION_DENIED".into() }),
        GenerationError::Permission(_)
    ));
    assert!(matches!(
        classify(ProviderError::ApiResponse { status: 400, body: "insufficient_quota".into() }),
        GenerationError::Quota(_)
    ));
    assert!(matches!(classify(ProviderError::MissingApiKey { var: "K".into() }), GenerationError::Auth(_)));
    assert!(matches!(classify(ProviderError::ApiRequest("reset".into())), GenerationError::Unknown(_)));
    assert!(matches!(
        classify(ProviderError::ApiResponse { status: 500, body: String::new() }),
        GenerationError::Unknown(_)
    ));
}

#[test]
fn classified_errors_do_not_leak_body() {
    let err = classify(ProviderError::ApiResponse { status: 401, body: "key sk-secret rejected".into() });
    assert!(!err.to_string().contains("sk-secret"));
}

#[test]
fn decode_three_accepts_code_fence() {
    let text = "```json\n{\"past\":\"a\",\"present\":\"b\",\"future\":\"c\"}\n```";
    assert_eq!(decode_three(text).unwrap(), ["a", "b", "c"].map(String::from));
}

#[test]
fn decode_three_rejects_blank_field() {
    let err = decode_three(r#"{"past":"a","present":" ","future":"c"}"#).unwrap_err();
    assert!(matches!(err, GenerationError::Malformed(msg) if msg.contains("present")));
}

#[test]
fn decode_three_rejects_non_json() {
    assert!(matches!(decode_three("The past was kind."), Err(GenerationError::Malformed(_))));
}
