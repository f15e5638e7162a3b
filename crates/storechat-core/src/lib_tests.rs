use super::*;

#[test]
fn test_history_mirrors_store_order() {
    let mut state = SessionState::new(100);
    state.push_user("What products do I have?");
    state.apply_reply("You have 12 products.", &ReplyMetadata::default());
    state.push_error("Sorry, I encountered an error. Please try again.");

    let history = state.history();
    let roles: Vec<Role> = history.iter().map(|h| h.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant, Role::Assistant]);
    assert_eq!(history[0].content, "What products do I have?");
}

#[test]
fn test_turn_request_from_state() {
    let mut state = SessionState::new(100);
    state.push_user("hi");
    state.apply_reply("hello", &ReplyMetadata::default());

    let start = state.begin_turn("next question").unwrap();
    let request = ChatTurnRequest::new("next question", start.history);

    assert_eq!(request.chat_history.len(), 2);
    assert!(request.chat_history.iter().all(|h| h.content != "next question"));
}

#[test]
fn test_message_ids_unique_across_burst() {
    let mut state = SessionState::default();
    let ids: Vec<MessageId> = (0..50).map(|i| state.push_user(format!("m{}", i))).collect();
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_reply_intent_maps_to_catalog() {
    let mut state = SessionState::default();
    let metadata = ReplyMetadata {
        intent: Some("create_discount_ask_more".to_string()),
        token_credits: None,
    };
    state.apply_reply("Let's set up a discount.", &metadata);

    let kind = state.current_intent().map(IntentKind::from_label);
    assert_eq!(kind, Some(IntentKind::CreateDiscountAskMore));
}
