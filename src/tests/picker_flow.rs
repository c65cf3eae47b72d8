use super::*;
use std::cell::RefCell;
use std::rc::Rc;

fn recording_checker(
    reply: CheckReply,
) -> (Rc<RefCell<Vec<String>>>, impl AvailabilityChecker + 'static) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let checker = move |username: &Username| {
        sink.borrow_mut().push(username.to_string());
        reply.clone()
    };
    (seen, checker)
}

#[test]
fn accepted_username_submits_form_after_delay() -> Result<()> {
    let mut h = load_page(PickerConfig::submit_form(), Alternating::new())?;
    h.type_text("#field-username", "john.doe-99")?;
    h.click("#submit")?;

    assert_eq!(h.state(), SubmissionState::Checking);
    assert_eq!(h.checker_calls(), 1);
    h.assert_value("#submit", "Checking...")?;
    h.assert_class("#submit", "button--disabled", true)?;
    assert!(h.submissions().is_empty());

    h.advance_time(749)?;
    assert_eq!(h.state(), SubmissionState::Checking);
    h.assert_class("#message", "hidden", true)?;

    h.advance_time(1)?;
    assert_eq!(h.state(), SubmissionState::Succeeded);
    h.assert_class("#message", "hidden", false)?;
    h.assert_text(
        "#message",
        "Success. Please wait a moment for your browser to redirect.",
    )?;

    let submissions = h.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].action, "submit");
    assert_eq!(submissions[0].method, "post");
    assert_eq!(submissions[0].field("username"), Some("john.doe-99"));
    assert_eq!(submissions[0].field("session_id"), Some("abc123"));
    assert_eq!(
        submissions[0].encoded_body(),
        "username=john.doe-99&session_id=abc123"
    );
    Ok(())
}

#[test]
fn empty_input_is_rejected_without_consulting_checker() -> Result<()> {
    let mut h = load_page(PickerConfig::default(), Alternating::new())?;
    h.click("#submit")?;

    assert_eq!(h.checker_calls(), 0);
    assert!(h.pending_timers().is_empty());
    assert_eq!(h.state(), SubmissionState::Failed);
    h.assert_text("#message", "Please enter a username.")?;
    h.assert_class("#message", "hidden", false)?;
    h.assert_value("#submit", "Submit")?;
    h.assert_class("#submit", "button--disabled", false)?;
    Ok(())
}

#[test]
fn disallowed_characters_list_the_allowed_set() -> Result<()> {
    let mut h = load_page(PickerConfig::default(), Alternating::new())?;
    h.type_text("#field-username", "bad user!")?;
    h.click("#submit")?;

    assert_eq!(h.checker_calls(), 0);
    h.assert_text(
        "#message",
        "Invalid username. Only the following characters are allowed: a-z, 0-9, ., _, -, /, =",
    )?;
    let html = h.inner_html("#message")?;
    assert!(html.contains("<code>a-z</code>, <code>0-9</code>"), "{html}");
    assert!(html.ends_with("<code>=</code>"), "{html}");
    h.assert_value("#submit", "Submit")?;
    Ok(())
}

#[test]
fn character_check_can_be_disabled() -> Result<()> {
    let config = PickerConfig {
        validate_characters: false,
        ..PickerConfig::default()
    };
    let (seen, checker) = recording_checker(CheckReply::Available);
    let mut h = load_page(config, checker)?;
    h.type_text("#field-username", "bad user!")?;
    h.click("#submit")?;
    h.flush()?;

    assert_eq!(*seen.borrow(), vec!["bad user!".to_string()]);
    assert_eq!(h.state(), SubmissionState::Succeeded);
    Ok(())
}

#[test]
fn submit_while_checking_is_ignored() -> Result<()> {
    let (seen, checker) = recording_checker(CheckReply::Unavailable);
    let mut h = load_page(PickerConfig::default(), checker)?;
    h.type_text("#field-username", "alice")?;
    h.click("#submit")?;
    h.click("#submit")?;
    h.press_enter("#field-username")?;

    assert_eq!(h.checker_calls(), 1);
    assert_eq!(h.pending_timers().len(), 1);
    assert_eq!(seen.borrow().len(), 1);

    h.flush()?;
    assert_eq!(h.now_ms(), 750);
    assert_eq!(h.state(), SubmissionState::Failed);

    h.click("#submit")?;
    assert_eq!(h.checker_calls(), 2);
    Ok(())
}

#[test]
fn unavailable_reply_reenables_control() -> Result<()> {
    let mut h = load_page(PickerConfig::default(), |_: &Username| CheckReply::Unavailable)?;
    h.type_text("#field-username", "taken")?;
    h.click("#submit")?;
    h.advance_time(750)?;

    h.assert_text(
        "#message",
        "This username is not available, please choose another.",
    )?;
    h.assert_value("#submit", "Submit")?;
    h.assert_class("#submit", "button--disabled", false)?;
    h.assert_class("#form", "hidden", false)?;
    assert_eq!(h.state(), SubmissionState::Failed);
    Ok(())
}

#[test]
fn hide_form_mode_hides_form_and_does_not_submit() -> Result<()> {
    let mut replies = vec![CheckReply::Available, CheckReply::Unavailable];
    let checker = move |_: &Username| replies.pop().unwrap_or(CheckReply::Unavailable);
    let mut h = load_page(PickerConfig::hide_form(), checker)?;
    h.type_text("#field-username", "carol")?;

    h.click("#submit")?;
    h.flush()?;
    assert_eq!(h.state(), SubmissionState::Failed);
    h.assert_class("#form", "hidden", false)?;

    h.click("#submit")?;
    h.flush()?;
    assert_eq!(h.state(), SubmissionState::Succeeded);
    h.assert_class("#form", "hidden", true)?;
    assert!(h.submissions().is_empty());
    // the control stays disabled after success
    h.assert_class("#submit", "button--disabled", true)?;
    h.click("#submit")?;
    assert_eq!(h.checker_calls(), 2);
    Ok(())
}

#[test]
fn alternating_checker_fails_the_second_attempt() -> Result<()> {
    let config = PickerConfig::hide_form();
    let mut first = load_page(config.clone(), Alternating::new())?;
    first.type_text("#field-username", "dave")?;
    first.click("#submit")?;
    first.flush()?;
    assert_eq!(first.state(), SubmissionState::Succeeded);

    let mut checker = Alternating::new();
    let candidate = Sanitizer::new()?
        .validate("dave")
        .map_err(|err| Error::Config(err.to_string()))?;
    assert_eq!(checker.check(&candidate), CheckReply::Available);

    let mut second = load_page(config, checker)?;
    second.type_text("#field-username", "dave")?;
    second.click("#submit")?;
    second.flush()?;
    assert_eq!(second.state(), SubmissionState::Failed);
    Ok(())
}

#[test]
fn enter_on_configured_key_event_submits_and_prevents_default() -> Result<()> {
    let mut h = load_page(PickerConfig::default(), AlwaysAvailable)?;
    h.type_text("#field-username", "erin")?;

    assert!(!h.dispatch_key("#field-username", "keypress", "Enter")?);
    assert_eq!(h.checker_calls(), 0);

    assert!(h.dispatch_key("#field-username", "keyup", "Enter")?);
    assert_eq!(h.checker_calls(), 1);
    assert_eq!(h.state(), SubmissionState::Checking);
    Ok(())
}

#[test]
fn keypress_variant_listens_on_keypress() -> Result<()> {
    let config = PickerConfig {
        enter_key_event: EnterKeyEvent::Keypress,
        ..PickerConfig::default()
    };
    let mut h = load_page(config, AlwaysAvailable)?;
    h.type_text("#field-username", "frank")?;

    assert!(!h.dispatch_key("#field-username", "keyup", "Enter")?);
    assert_eq!(h.checker_calls(), 0);

    assert!(h.press_key("#field-username", "Enter")?);
    assert_eq!(h.checker_calls(), 1);
    Ok(())
}

#[test]
fn has_contents_class_tracks_field_emptiness() -> Result<()> {
    let mut h = load_page(PickerConfig::default(), AlwaysAvailable)?;
    h.assert_class("#field-username", "has-contents", false)?;

    h.type_text("#field-username", "g")?;
    h.assert_class("#field-username", "has-contents", true)?;

    h.type_text("#field-username", "")?;
    h.assert_class("#field-username", "has-contents", false)?;

    // plain keystrokes on the configured event re-evaluate too
    h.type_text("#field-username", "gina")?;
    h.dispatch("#field-username", "change")?;
    h.assert_class("#field-username", "has-contents", true)?;
    assert!(!h.press_key("#field-username", "a")?);
    assert_eq!(h.checker_calls(), 0);
    Ok(())
}

#[test]
fn session_id_is_copied_into_hidden_field_at_load() -> Result<()> {
    let h = Page::load(
        "https://idp.example.org/pick?foo=1&session_id=a%2Fb+c#top",
        PICKER_HTML,
        PickerConfig::submit_form(),
        AlwaysAvailable,
    )?;
    assert_eq!(h.session_id(), Some("a/b c"));
    h.assert_value("#session_id", "a/b c")?;
    Ok(())
}

#[test]
fn missing_query_string_leaves_session_field_empty() -> Result<()> {
    let mut h = Page::load(
        "https://idp.example.org/pick",
        PICKER_HTML,
        PickerConfig::submit_form(),
        AlwaysAvailable,
    )?;
    assert_eq!(h.session_id(), None);
    h.assert_value("#session_id", "")?;

    h.type_text("#field-username", "hank")?;
    h.click("#submit")?;
    h.flush()?;
    assert_eq!(h.submissions()[0].field("session_id"), Some(""));
    Ok(())
}

#[test]
fn malformed_session_encoding_fails_load() {
    let err = Page::load(
        "https://idp.example.org/pick?session_id=%zz",
        PICKER_HTML,
        PickerConfig::submit_form(),
        AlwaysAvailable,
    )
    .expect_err("bad percent-encoding should fail");
    assert!(matches!(err, Error::Url(_)), "{err:?}");
}

#[test]
fn missing_handles_fail_fast() {
    let html = r#"<form id="form"><input id="field-username"><input id="submit"></form>"#;
    let err = Page::load(SESSION_URL, html, PickerConfig::default(), AlwaysAvailable)
        .expect_err("message element is required");
    assert!(matches!(err, Error::MissingElement(ref id) if id == "message"), "{err:?}");

    let html = r#"
        <form id="form"><input id="field-username"><input id="submit"></form>
        <p id="message"></p>
    "#;
    assert!(Page::load(SESSION_URL, html, PickerConfig::hide_form(), AlwaysAvailable).is_ok());
    let err = Page::load(SESSION_URL, html, PickerConfig::submit_form(), AlwaysAvailable)
        .expect_err("session field is required when submitting");
    assert!(matches!(err, Error::MissingElement(ref id) if id == "session_id"), "{err:?}");
}

#[test]
fn transport_failure_reason_is_escaped() -> Result<()> {
    let checker = |_: &Username| CheckReply::Failed("<img src=x onerror=alert(1)>".into());
    let mut h = load_page(PickerConfig::default(), checker)?;
    h.type_text("#field-username", "ivy")?;
    h.click("#submit")?;
    h.flush()?;

    h.assert_text(
        "#message",
        "Unable to check username availability: <img src=x onerror=alert(1)>",
    )?;
    let html = h.inner_html("#message")?;
    assert!(html.contains("&lt;img src=x onerror=alert(1)&gt;"), "{html}");
    assert!(!html.contains("<img"), "{html}");
    h.assert_value("#submit", "Submit")?;
    Ok(())
}

#[test]
fn replayed_backend_bodies_drive_outcomes() -> Result<()> {
    let checker = ReplayChecker::new([r#"{"available": false}"#, r#"{"available": true}"#]);
    let mut h = load_page(PickerConfig::submit_form(), checker)?;
    h.type_text("#field-username", "jack")?;

    h.click("#submit")?;
    h.flush()?;
    assert_eq!(h.state(), SubmissionState::Failed);

    h.click("#submit")?;
    h.flush()?;
    assert_eq!(h.state(), SubmissionState::Succeeded);
    assert_eq!(h.submissions().len(), 1);
    Ok(())
}

#[test]
fn lowercasing_applies_only_to_the_checked_value() -> Result<()> {
    let config = PickerConfig {
        lowercase_before_check: true,
        ..PickerConfig::submit_form()
    };
    let (seen, checker) = recording_checker(CheckReply::Available);
    let mut h = load_page(config, checker)?;
    h.type_text("#field-username", "Kate.Smith")?;
    h.click("#submit")?;
    h.flush()?;

    assert_eq!(*seen.borrow(), vec!["kate.smith".to_string()]);
    assert_eq!(h.submissions()[0].field("username"), Some("Kate.Smith"));
    Ok(())
}

#[test]
fn button_control_label_uses_text_content() -> Result<()> {
    let html = r#"
        <form id="form">
          <input id="field-username" name="username">
          <button id="submit" type="button">Submit</button>
        </form>
        <div id="message" class="hidden"></div>
    "#;
    let mut h = Page::load(SESSION_URL, html, PickerConfig::default(), |_: &Username| {
        CheckReply::Unavailable
    })?;
    h.type_text("#field-username", "liam")?;
    h.click("#submit")?;
    h.assert_text("#submit", "Checking...")?;
    h.flush()?;
    h.assert_text("#submit", "Submit")?;
    Ok(())
}

#[test]
fn custom_labels_and_delay_are_honored() -> Result<()> {
    let config = PickerConfig {
        check_delay_ms: 20,
        labels: Labels {
            submit: "Continue".into(),
            checking: "Please wait".into(),
        },
        ..PickerConfig::default()
    };
    let mut h = load_page(config, |_: &Username| CheckReply::Unavailable)?;
    h.type_text("#field-username", "mia")?;
    h.click("#submit")?;
    h.assert_value("#submit", "Please wait")?;
    assert_eq!(
        h.pending_timers(),
        vec![PendingTimer {
            id: 1,
            due_at: 20,
            order: 0
        }]
    );
    h.advance_time(20)?;
    h.assert_value("#submit", "Continue")?;
    Ok(())
}

#[test]
fn timer_controls_reject_bad_input() -> Result<()> {
    let mut h = load_page(PickerConfig::default(), AlwaysAvailable)?;
    assert!(matches!(h.advance_time(-1), Err(Error::Timer(_))));
    h.advance_time(10)?;
    assert!(matches!(h.advance_time_to(5), Err(Error::Timer(_))));
    assert!(h.set_timer_step_limit(0).is_err());
    assert!(!h.run_next_timer()?);
    assert_eq!(h.run_due_timers()?, 0);
    Ok(())
}

#[test]
fn run_next_timer_jumps_clock_to_due_time() -> Result<()> {
    let mut h = load_page(PickerConfig::default(), AlwaysAvailable)?;
    h.type_text("#field-username", "noah")?;
    h.click("#submit")?;
    assert_eq!(h.run_due_timers()?, 0);
    assert!(h.run_next_timer()?);
    assert_eq!(h.now_ms(), 750);
    assert_eq!(h.state(), SubmissionState::Succeeded);
    Ok(())
}

#[test]
fn trace_log_records_events_and_timers() -> Result<()> {
    let mut h = load_page(PickerConfig::default(), AlwaysAvailable)?;
    h.enable_trace(true);
    h.type_text("#field-username", "olive")?;
    h.click("#submit")?;
    h.advance_time_to(750)?;

    let logs = h.take_trace_logs();
    assert!(logs.iter().any(|line| line == "[event] input target=#field-username"));
    assert!(logs.iter().any(|line| line == "[event] click target=#submit"));
    assert!(
        logs.iter()
            .any(|line| line == "[picker] check username=olive timer=1 delay_ms=750")
    );
    assert!(logs.iter().any(|line| line == "[timer] run id=1 due_at=750 now_ms=750"));
    assert!(
        logs.iter()
            .any(|line| line == "[timer] advance_to from=0 to=750 ran_due=1")
    );
    assert!(h.take_trace_logs().is_empty());

    h.set_trace_log_limit(1)?;
    h.dispatch("#field-username", "change")?;
    h.dispatch("#field-username", "change")?;
    assert_eq!(h.take_trace_logs().len(), 1);
    Ok(())
}

#[test]
fn selectors_are_id_only() -> Result<()> {
    let mut h = load_page(PickerConfig::default(), AlwaysAvailable)?;
    assert!(matches!(
        h.click(".button"),
        Err(Error::UnsupportedSelector(_))
    ));
    assert!(matches!(
        h.click("#nope"),
        Err(Error::SelectorNotFound(_))
    ));
    assert!(matches!(
        h.type_text("#message", "x"),
        Err(Error::TypeMismatch { .. })
    ));
    h.assert_exists("#form")?;
    Ok(())
}

#[test]
fn failed_assertion_reports_snippet() -> Result<()> {
    let h = load_page(PickerConfig::default(), AlwaysAvailable)?;
    let err = h
        .assert_value("#submit", "Go")
        .expect_err("label is Submit");
    match err {
        Error::AssertionFailed {
            actual,
            dom_snippet,
            ..
        } => {
            assert_eq!(actual, "Submit");
            assert_eq!(
                dom_snippet,
                r#"<input class="button" id="submit" type="button" value="Submit">"#
            );
        }
        other => panic!("unexpected error: {other:?}"),
    }
    Ok(())
}

#[test]
fn submit_control_is_not_sent_as_a_form_field() -> Result<()> {
    let html = r#"
        <form id="form" action="submit" method="post">
          <input type="text" id="field-username" name="username">
          <input type="hidden" id="session_id" name="session_id">
          <input type="submit" id="submit" name="go" value="Submit">
        </form>
        <p id="message" class="hidden"></p>
    "#;
    let mut h = Page::load(SESSION_URL, html, PickerConfig::submit_form(), AlwaysAvailable)?;
    h.type_text("#field-username", "alice")?;
    h.click("#submit")?;
    h.flush()?;

    let submission = &h.submissions()[0];
    assert_eq!(submission.field("go"), None);
    assert_eq!(
        submission.fields,
        vec![
            ("username".to_string(), "alice".to_string()),
            ("session_id".to_string(), "abc123".to_string()),
        ]
    );
    Ok(())
}

#[test]
fn deeply_nested_form_submits() -> Result<()> {
    let depth = 100_000;
    let html = format!(
        r#"<form id="form" action="submit" method="post">{}
             <input type="text" id="field-username" name="username">
             <input type="hidden" id="session_id" name="session_id">
             <input type="button" id="submit" value="Submit">
           </form>
           <p id="message" class="hidden"></p>"#,
        "<div>".repeat(depth)
    );
    let mut h = Page::load(SESSION_URL, &html, PickerConfig::submit_form(), AlwaysAvailable)?;
    h.type_text("#field-username", "deep")?;
    h.click("#submit")?;
    h.flush()?;

    assert_eq!(h.state(), SubmissionState::Succeeded);
    assert_eq!(h.submissions()[0].field("username"), Some("deep"));
    assert_eq!(h.inner_html("#form")?.matches("<div>").count(), depth);
    Ok(())
}
