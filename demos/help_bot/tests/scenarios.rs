//! End-to-end conversations against the help bot handler table.

use std::sync::Arc;

use help_bot::{BAD_MOOD_PROMPT, HELP_PROMPT, HOTLINE_REPLY, HR_REPLY, MOOD_PROMPT, handlers};
use parley::prelude::*;
use parking_lot::Mutex;

#[derive(Default)]
struct Recorder {
    replies: Mutex<Vec<String>>,
}

impl Recorder {
    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.replies.lock())
    }
}

#[async_trait]
impl ReplySink for Recorder {
    async fn reply(&self, _event: &Event, message: Message) -> ReplyResult<()> {
        self.replies.lock().push(message.text);
        Ok(())
    }
}

fn setup() -> (Dispatcher, Arc<Recorder>) {
    let mut builder = HandlerRegistry::builder();
    builder.extend(handlers("helpbot"));
    let registry = builder.build().unwrap();

    let recorder = Arc::new(Recorder::default());
    (Dispatcher::new(registry, recorder.clone()), recorder)
}

fn key() -> ConversationKey {
    ConversationKey::new("C1", "U1")
}

fn message(text: &str) -> Event {
    Event::text_event(EventType::Message, key(), text)
}

fn armed(name: &str) -> ConversationState {
    ConversationState::Armed(name.to_string())
}

#[tokio::test]
async fn test_help_conversation() {
    let (dispatcher, recorder) = setup();

    let outcome = dispatcher.dispatch(message("help me")).await;
    assert_eq!(outcome.handler(), Some("helpMe"));
    assert_eq!(recorder.take(), vec![HELP_PROMPT]);
    assert_eq!(dispatcher.conversation_state(&key()).await, armed("helpQuestion"));

    let outcome = dispatcher.dispatch(message("I feel suicidal")).await;
    assert_eq!(outcome.handler(), Some("helpQuestion"));
    assert_eq!(recorder.take(), vec![HOTLINE_REPLY]);
    assert_eq!(dispatcher.conversation_state(&key()).await, ConversationState::Idle);
}

#[tokio::test]
async fn test_help_question_rejects_unknown_request() {
    let (dispatcher, recorder) = setup();

    dispatcher.dispatch(message("help me")).await;
    recorder.take();

    dispatcher.dispatch(message("what time is it")).await;
    assert_eq!(recorder.take(), vec!["You did not use a valid command."]);
    assert_eq!(dispatcher.conversation_state(&key()).await, ConversationState::Idle);
}

#[tokio::test]
async fn test_help_question_matches_inside_words() {
    let (dispatcher, recorder) = setup();

    for (answer, expected) in [
        ("I keep thinking about suicides", HOTLINE_REPLY),
        ("SuicidalThoughts", HOTLINE_REPLY),
        ("running tests", "Hi, thanks for your test message."),
    ] {
        dispatcher.dispatch(message("help me")).await;
        recorder.take();

        dispatcher.dispatch(message(answer)).await;
        assert_eq!(recorder.take(), vec![expected], "answer: {answer}");
        assert_eq!(dispatcher.conversation_state(&key()).await, ConversationState::Idle);
    }
}

#[tokio::test]
async fn test_mood_conversation() {
    let (dispatcher, recorder) = setup();

    dispatcher.dispatch(message("mood")).await;
    assert_eq!(recorder.take(), vec![MOOD_PROMPT]);
    assert_eq!(dispatcher.conversation_state(&key()).await, armed("moodHelp"));

    dispatcher.dispatch(message("I'm sad today")).await;
    assert_eq!(recorder.take(), vec![BAD_MOOD_PROMPT]);
    assert_eq!(dispatcher.conversation_state(&key()).await, armed("checkBadMood"));

    let outcome = dispatcher.dispatch(message("my manager is awful")).await;
    assert_eq!(outcome.handler(), Some("checkBadMood"));
    assert_eq!(recorder.take(), vec![HR_REPLY]);
    assert_eq!(dispatcher.conversation_state(&key()).await, ConversationState::Idle);
}

#[tokio::test]
async fn test_mood_step_asks_again_on_unclear_answer() {
    let (dispatcher, recorder) = setup();

    dispatcher.dispatch(message("mood")).await;
    dispatcher.dispatch(message("hmm")).await;
    assert_eq!(recorder.take().len(), 2);
    assert_eq!(dispatcher.conversation_state(&key()).await, armed("moodHelp"));

    dispatcher.dispatch(message("pretty good")).await;
    assert_eq!(dispatcher.conversation_state(&key()).await, ConversationState::Idle);
}

#[tokio::test]
async fn test_unmatched_message_is_dropped() {
    let (dispatcher, recorder) = setup();

    let outcome = dispatcher.dispatch(message("nothing to see here")).await;
    assert!(!outcome.is_handled());
    assert!(recorder.take().is_empty());
    assert_eq!(dispatcher.conversation_state(&key()).await, ConversationState::Idle);
}

#[tokio::test]
async fn test_one_shot_handlers() {
    let (dispatcher, recorder) = setup();

    let dm = Event::text_event(EventType::DirectMessage, key(), "hello");
    dispatcher.dispatch(dm).await;
    assert_eq!(recorder.take(), vec!["Hi, I am helpbot"]);

    dispatcher.dispatch(message("ab12cd")).await;
    assert_eq!(
        recorder.take(),
        vec!["First group: ab12cd\nSecond group: ab\nThird group: 12\nFourth group: cd"]
    );

    let pin = Event::builder(EventType::PinAdded, key()).build();
    let outcome = dispatcher.dispatch(pin).await;
    assert_eq!(outcome.handler(), Some("pinAdded"));
    assert_eq!(recorder.take().len(), 1);

    let file = Event::builder(EventType::FileShared, key()).build();
    let outcome = dispatcher.dispatch(file).await;
    assert_eq!(outcome.handler(), Some("fileShared"));
    assert!(recorder.take().is_empty());
}

#[tokio::test]
async fn test_conversations_are_per_user() {
    let (dispatcher, recorder) = setup();
    let other = ConversationKey::new("C1", "U2");

    dispatcher.dispatch(message("help me")).await;
    dispatcher
        .dispatch(Event::text_event(EventType::Message, other.clone(), "testing"))
        .await;

    // U2 never asked for help, so its message goes through the normal scan
    assert_eq!(recorder.take(), vec![HELP_PROMPT]);
    assert_eq!(dispatcher.conversation_state(&other).await, ConversationState::Idle);
    assert_eq!(dispatcher.conversation_state(&key()).await, armed("helpQuestion"));
}
