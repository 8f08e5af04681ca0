/// Integration tests for the token lifecycle and the random generator

#[cfg(test)]
mod tests {
    use serde_json::json;
    use std::sync::Arc;
    use websec_core::config::{CsrfConfig, ToolkitConfig};
    use websec_core::csrf::{Expiry, ManualClock, TokenProvider};
    use websec_core::http::{HeaderSet, RequestInfo, Sanitizer};
    use websec_core::storage::{FileSessionStore, MemorySessionStore, SessionStore};
    use websec_core::{SecurityError, ValueGenerator};

    fn login_form(store: Arc<dyn SessionStore>, clock: Arc<ManualClock>) -> TokenProvider {
        TokenProvider::new(CsrfConfig::new("csrf-token", "login-form", 3600), store)
            .unwrap()
            .with_clock(clock)
    }

    #[test]
    fn test_login_form_scenario() {
        let store = Arc::new(MemorySessionStore::new());
        let clock = Arc::new(ManualClock::new(1000));
        let mut provider = login_form(store.clone(), clock.clone());

        assert_eq!(provider.token_name(), "csrf-token:login-form");

        let token = provider.issue_token(false).unwrap();
        assert_eq!(token.name, "login-form");
        assert_eq!(token.token_name, "csrf-token:login-form");
        assert_eq!(token.issued_at, 1000);
        assert_eq!(token.expires_at, Expiry::At(4600));
        assert_eq!(
            store.get("csrf-token:login-form").unwrap().unwrap()["expire"],
            json!(4600)
        );

        clock.set(4599);
        assert!(provider.validate(&token.value));
        assert!(!provider.validate("wrong-value"));

        clock.set(4600);
        assert!(provider.validate(&token.value));

        clock.set(4601);
        assert!(!provider.validate(&token.value));
    }

    #[test]
    fn test_second_request_validates_against_same_session() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let clock = Arc::new(ManualClock::new(1000));

        let token = login_form(store.clone(), clock.clone()).issue_token(false).unwrap();

        // A fresh provider has no cached token but reads the shared session
        let next_request = login_form(store, clock);
        assert!(next_request.validate(&token.value));
    }

    #[test]
    fn test_no_active_session() {
        let store = Arc::new(MemorySessionStore::unstarted());
        let mut provider = login_form(store.clone(), Arc::new(ManualClock::new(0)));

        assert!(!provider.validate("anything"));
        assert!(matches!(
            provider.issue_token(false),
            Err(SecurityError::SessionUnavailable(_))
        ));

        store.start().unwrap();
        let token = provider.issue_token(false).unwrap();
        assert!(provider.validate(&token.value));

        store.end().unwrap();
        assert!(!provider.validate(&token.value));
    }

    #[test]
    fn test_file_session_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let clock = Arc::new(ManualClock::new(50));

        let token = {
            let store = Arc::new(FileSessionStore::open(&path).unwrap());
            login_form(store, clock.clone()).issue_token(false).unwrap()
        };

        let store = Arc::new(FileSessionStore::open(&path).unwrap());
        let provider = login_form(store, clock);
        assert!(provider.validate(&token.value));
        assert!(!provider.validate(&token.value[1..]));
    }

    #[test]
    fn test_provider_from_toml_config() {
        let config = ToolkitConfig::from_toml_str(
            r#"
            [csrf]
            token_name_prefix = "xsrf"
            name = "checkout"
            timeout = 0

            [headers.csrf_token]
            header_name = "X-XSRF-Token"
            "#,
        )
        .unwrap();

        let mut provider =
            TokenProvider::new(config.csrf.clone(), Arc::new(MemorySessionStore::new())).unwrap();
        assert_eq!(provider.token_name(), "xsrf:checkout");

        let token = provider.issue_token(false).unwrap();
        assert_eq!(token.expires_at, Expiry::Never);

        let headers = HeaderSet::from_config(&config.headers, Some(&token));
        assert_eq!(headers.lines(), vec![format!("X-XSRF-Token: {}", token.value)]);
        assert_eq!(headers.directives(&RequestInfo::default()).len(), 1);
    }

    #[test]
    fn test_header_from_stored_session_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let clock = Arc::new(ManualClock::new(1000));

        let issued = {
            let store = Arc::new(FileSessionStore::open(&path).unwrap());
            login_form(store, clock.clone()).issue_token(false).unwrap()
        };

        let config = ToolkitConfig::from_toml_str("[headers.csrf_token]\n").unwrap();
        let store = Arc::new(FileSessionStore::open(&path).unwrap());
        let stored = login_form(store, clock).stored_token().unwrap();
        assert_eq!(stored, issued);

        let headers = HeaderSet::from_config(&config.headers, Some(&stored));
        assert_eq!(headers.to_string(), format!("X-CSRF-Token: {}\r\n", issued.value));
    }

    #[test]
    fn test_sanitizer_from_toml_config() {
        let config = ToolkitConfig::from_toml_str(
            r#"
            [sanitizer]
            allowed = "p,strong"
            "#,
        )
        .unwrap();

        let sanitizer = Sanitizer::new(&config.sanitizer).unwrap();
        assert_eq!(
            sanitizer.sanitize("<p onclick=\"x()\"><strong>ok</strong><script>bad()</script><u>u</u></p>"),
            "<p><strong>ok</strong>u</p>"
        );
    }

    #[test]
    fn test_generator_contract() {
        let generator = ValueGenerator::default();

        assert_eq!(generator.integer(5, 5, true).unwrap(), 5);
        assert!(matches!(
            generator.integer(10, 5, true),
            Err(SecurityError::InvalidRange(_))
        ));
        assert!(matches!(
            generator.string(0, "", true),
            Err(SecurityError::InvalidLength(0))
        ));
        assert_eq!(generator.string(6, "A", true).unwrap(), "AAAAAA");

        let id = generator.string(22, "", true).unwrap();
        assert_eq!(id.len(), 22);
        assert!(id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_'));

        for _ in 0..500 {
            let v = generator.integer(-3, 3, false).unwrap();
            assert!((-3..=3).contains(&v));
        }
    }
}
