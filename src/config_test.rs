use super::*;
use std::collections::HashMap;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn defaults() {
    let cfg = AppConfig::from_lookup(&lookup(&[])).unwrap();
    assert_eq!(cfg.port, DEFAULT_PORT);
    assert_eq!(cfg.bind_addr, DEFAULT_BIND_ADDR);
    assert_eq!(cfg.environment, Environment::Development);
    assert_eq!(cfg.rate_limits.message.limit, 10);
    assert_eq!(cfg.rate_limits.image.limit, 5);
    assert_eq!(cfg.rate_limits.message.window, Duration::from_secs(60));
    assert_eq!(cfg.rate_limits.image.soft_threshold, cfg.rate_limits.message.soft_threshold);
    assert_eq!(cfg.rate_limits.image.hard_threshold, 200);
    assert_eq!(cfg.timeouts.text, Duration::from_secs(30));
    assert_eq!(cfg.timeouts.image, Duration::from_secs(60));
}

#[test]
fn overrides() {
    let cfg = AppConfig::from_lookup(&lookup(&[
        ("PORT", "8080"),
        ("APP_ENV", "Production"),
        ("RATE_LIMIT_WINDOW_SECS", "30"),
        ("RATE_LIMIT_IMAGE_PER_WINDOW", "2"),
        ("SUSPICION_SOFT_THRESHOLD", "20"),
        ("GENERATION_TEXT_TIMEOUT_SECS", "5"),
    ]))
    .unwrap();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.environment, Environment::Production);
    assert!(!cfg.environment.exposes_details());
    assert_eq!(cfg.rate_limits.image.limit, 2);
    assert_eq!(cfg.rate_limits.csp.window, Duration::from_secs(30));
    assert_eq!(cfg.rate_limits.message.soft_threshold, 20);
    assert_eq!(cfg.timeouts.text, Duration::from_secs(5));
}

#[test]
fn garbage_values_fall_back() {
    let cfg = AppConfig::from_lookup(&lookup(&[("PORT", "eighty"), ("RATE_LIMIT_MESSAGE_PER_WINDOW", "-3")])).unwrap();
    assert_eq!(cfg.port, DEFAULT_PORT);
    assert_eq!(cfg.rate_limits.message.limit, DEFAULT_MESSAGE_LIMIT);
}

#[test]
fn unknown_provider_is_an_error() {
    assert!(AppConfig::from_lookup(&lookup(&[("PROVIDER", "nope")])).is_err());
}

#[test]
fn parse_or_trims() {
    assert_eq!(parse_or(Some(" 42 ".into()), 0u32), 42);
    assert_eq!(parse_or::<u32>(None, 7), 7);
}

#[test]
fn zero_sweep_interval_falls_back_to_default() {
    let cfg = AppConfig::from_lookup(&lookup(&[("RATE_LIMIT_SWEEP_SECS", "0")])).unwrap();
    assert_eq!(cfg.rate_limits.sweep_interval, Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS));

    let cfg = AppConfig::from_lookup(&lookup(&[("RATE_LIMIT_SWEEP_SECS", "7")])).unwrap();
    assert_eq!(cfg.rate_limits.sweep_interval, Duration::from_secs(7));
}
