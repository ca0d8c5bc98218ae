//! Help Bot handlers
//!
//! The handler table for the console help-desk bot. It is kept in a library
//! so the scenarios under `tests/` can drive it without a terminal.
//!
//! # Conversations
//!
//! ```text
//! "help me" ──▶ helpMe ──▶ helpQuestion ──▶ idle
//!
//! "mood" ──▶ mood ──▶ moodHelp ──┬─(good)──▶ idle
//!                               ├─(bad)───▶ checkBadMood ──▶ idle
//!                               └─(other)─▶ moodHelp (asks again)
//! ```

use std::sync::{Arc, LazyLock};

use parley::prelude::*;
use regex::Regex;

/// Reply sent to anyone mentioning suicide.
pub const HOTLINE_REPLY: &str =
    "I recommend that you call the National Suicide Hotline at 1-800-273-8255.";

/// Reply sent when the bot is pinned.
pub const PIN_REPLY: &str =
    "Thanks for the pin! You can find all pinned items under channel details.";

/// Reply that opens the help conversation.
pub const HELP_PROMPT: &str = "What do you need help with?";

/// Reply that opens the mood conversation.
pub const MOOD_PROMPT: &str = "How are you feeling today?";

/// Reply when the user reports a bad mood.
pub const BAD_MOOD_PROMPT: &str = "What's wrong?";

/// Reply when the user's trouble is work related.
pub const HR_REPLY: &str = "That sounds hard. Please reach out to HR, they can help with problems at work.";

static SUICIDE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(suicide|suicidal)").expect("valid pattern"));
static TEST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(test|testing)").expect("valid pattern"));
static BAD_MOOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(sad|bad|upset|angry|awful|terrible|depressed|down)").expect("valid pattern")
});
static GOOD_MOOD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(good|great|happy|fine|awesome)").expect("valid pattern"));
static WORK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(manager|boss|work|job|coworker)").expect("valid pattern"));

// ============================================================================
// One-shot handlers
// ============================================================================

async fn receive_message(
    whole: Group<0>,
    first: Group<1>,
    second: Group<2>,
    third: Group<3>,
) -> String {
    format!(
        "First group: {}\nSecond group: {}\nThird group: {}\nFourth group: {}",
        whole.0, first.0, second.0, third.0
    )
}

async fn pin_added() -> &'static str {
    PIN_REPLY
}

async fn file_shared(event: Arc<Event>) {
    info!(key = %event.key(), payload = %event.raw(), "File shared");
}

// ============================================================================
// Help conversation
// ============================================================================

async fn help_me(ctx: Arc<HandlerContext>) -> &'static str {
    ctx.start_conversation("helpQuestion");
    HELP_PROMPT
}

async fn help_question(ctx: Arc<HandlerContext>, text: Text) -> &'static str {
    ctx.stop_conversation();
    if SUICIDE.is_match(&text) {
        HOTLINE_REPLY
    } else if TEST.is_match(&text) {
        "Hi, thanks for your test message."
    } else {
        "You did not use a valid command."
    }
}

// ============================================================================
// Mood conversation
// ============================================================================

async fn mood(ctx: Arc<HandlerContext>) -> &'static str {
    ctx.advance();
    MOOD_PROMPT
}

async fn mood_help(ctx: Arc<HandlerContext>, text: Text) -> &'static str {
    if BAD_MOOD.is_match(&text) {
        ctx.advance();
        BAD_MOOD_PROMPT
    } else if GOOD_MOOD.is_match(&text) {
        ctx.stop_conversation();
        "Glad to hear it! Have a great day."
    } else {
        // No transition: stay on this step and ask again
        "Sorry, I didn't get that. Are you feeling good or bad?"
    }
}

async fn check_bad_mood(ctx: Arc<HandlerContext>, text: Text) -> &'static str {
    ctx.stop_conversation();
    if SUICIDE.is_match(&text) {
        HOTLINE_REPLY
    } else if WORK.is_match(&text) {
        HR_REPLY
    } else {
        "I'm sorry to hear that. I hope things get better soon."
    }
}

// ============================================================================
// Registration
// ============================================================================

/// Builds the handler table in priority order.
///
/// `bot_name` is used by the greeting sent to direct mentions and messages.
pub fn handlers(bot_name: &str) -> Vec<HandlerDescriptor> {
    let name: Arc<str> = Arc::from(bot_name);
    let greet = move || {
        let name = Arc::clone(&name);
        async move { format!("Hi, I am {name}") }
    };

    vec![
        on_direct("greeting").handler(greet),
        on_message("receiveMessage")
            .pattern(r"^([a-z ]{2})(\d+)([a-z ]{2})$")
            .handler(receive_message),
        on_event_type("pinAdded", EventType::PinAdded).handler(pin_added),
        on_event_type("fileShared", EventType::FileShared).handler(file_shared),
        on_pattern("helpMe", "(help me)")
            .next("helpQuestion")
            .handler(help_me),
        HandlerDescriptor::new("helpQuestion")
            .conversation_only()
            .handler(help_question),
        on_pattern("mood", r"\bmood\b").next("moodHelp").handler(mood),
        HandlerDescriptor::new("moodHelp")
            .next("checkBadMood")
            .handler(mood_help),
        HandlerDescriptor::new("checkBadMood").handler(check_bad_mood),
    ]
}
