use super::*;

#[test]
fn builtin_sets_compile() {
    assert_eq!(generic_xss().name(), "generic_xss");
    assert_eq!(image_prompt().name(), "image_prompt");
    assert_eq!(generic_xss().first_violation("a naked figure"), None);
    assert_eq!(image_prompt().first_violation("a naked figure"), Some("explicit_content"));
    assert_eq!(image_prompt().first_violation("<script>"), Some("script_tag"));
}

#[test]
fn script_tag_any_case() {
    for text in ["<script>alert(1)</script>", "<SCRIPT>", "< ScRiPt src=x>"] {
        assert_eq!(generic_xss().first_violation(text), Some("script_tag"), "{text}");
    }
}

#[test]
fn javascript_and_vbscript_uris() {
    assert_eq!(generic_xss().first_violation("click JavaScript:void(0)"), Some("javascript_uri"));
    assert_eq!(generic_xss().first_violation("VBScript:msgbox"), Some("vbscript_uri"));
}

#[test]
fn any_html_tag() {
    assert_eq!(generic_xss().first_violation("hello <b>world</b>"), Some("html_tag"));
    assert_eq!(generic_xss().first_violation("<img src=x onerror=y>"), Some("html_tag"));
}

#[test]
fn plain_text_is_clean() {
    assert_eq!(generic_xss().first_violation("The Lantern: a small flame in the dark wood."), None);
    assert_eq!(generic_xss().first_violation("past, present & future: 3 cards"), None);
}

#[test]
fn explicit_terms_only_in_image_set() {
    let text = "a NSFW portrait";
    assert_eq!(generic_xss().first_violation(text), None);
    assert_eq!(image_prompt().first_violation(text), Some("explicit_content"));
}

#[test]
fn explicit_terms_match_whole_words() {
    assert_eq!(image_prompt().first_violation("an expressive, sextant-shaped amulet"), None);
    assert!(image_prompt().first_violation("a naked figure").is_some());
}

#[test]
fn custom_rule_set() {
    let set = RuleSet::new("custom").with_rule("curse", r"(?i)\bdarn\b").unwrap();
    assert_eq!(set.first_violation("Darn it"), Some("curse"));
    assert!(RuleSet::new("bad").with_rule("broken", "(").is_err());
}
