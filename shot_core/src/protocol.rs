//! Control-plane message parsing.
//!
//! Two dialects are supported:
//!
//! - `Strict` (default): the trimmed message must be exactly one keyword, or
//!   a JSON object. Anything else is ignored.
//! - `Legacy`: the message is scanned for substrings in a fixed order
//!   (`status`, `{`, `on`, `off`, `os`) and every match yields a command, so
//!   one message can produce several. A `{` that does not open a valid JSON
//!   object still yields an empty patch.
//!
//! Keywords:
//!
//! | Keyword                | Command        |
//! |------------------------|----------------|
//! | `status`               | `Status`       |
//! | `on`, `start`          | `Start`        |
//! | `off`, `stop`          | `Stop`         |
//! | `os`, `single-shot`    | `SingleShot`   |
//! | `{ ... }`              | `Patch`        |

use serde_json::{Map, Value};

use crate::status::{Phase, ShotBudget};

/// How inbound text is turned into commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    Strict,
    Legacy,
}

/// Partial parameter update. Absent or invalid fields are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Patch {
    pub shots: Option<ShotBudget>,
    pub delay_ms: Option<f64>,
    /// Restricted to `Starting` or `Idle`.
    pub phase: Option<Phase>,
}

impl Patch {
    pub fn is_empty(&self) -> bool {
        self.shots.is_none() && self.delay_ms.is_none() && self.phase.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Unicast status reply to the sender.
    Status,
    /// Force Starting.
    Start,
    /// Force Idle.
    Stop,
    /// One shot, then Idle.
    SingleShot,
    Patch(Patch),
}

/// Parse one inbound message into zero or more commands.
pub fn parse(message: &str, dialect: Dialect) -> Vec<Command> {
    match dialect {
        Dialect::Strict => parse_strict(message).into_iter().collect(),
        Dialect::Legacy => parse_legacy(message),
    }
}

pub fn parse_strict(message: &str) -> Option<Command> {
    let text = message.trim();
    match text {
        "status" => Some(Command::Status),
        "on" | "start" => Some(Command::Start),
        "off" | "stop" => Some(Command::Stop),
        "os" | "single-shot" => Some(Command::SingleShot),
        _ if text.starts_with('{') => parse_patch(text).map(Command::Patch),
        _ => None,
    }
}

pub fn parse_legacy(message: &str) -> Vec<Command> {
    let mut out = Vec::new();
    if message.contains("status") {
        out.push(Command::Status);
    }
    if let Some(start) = message.find('{') {
        // Only the first JSON value counts; trailing text is left for the
        // keyword scan below.
        let patch = serde_json::Deserializer::from_str(&message[start..])
            .into_iter::<Value>()
            .next()
            .and_then(|v| v.ok())
            .and_then(|v| patch_from_value(&v))
            .unwrap_or_default();
        out.push(Command::Patch(patch));
    }
    if message.contains("on") {
        out.push(Command::Start);
    }
    if message.contains("off") {
        out.push(Command::Stop);
    }
    if message.contains("os") {
        out.push(Command::SingleShot);
    }
    out
}

/// Parse a JSON object into a patch. Unknown keys are ignored and each known
/// key is validated on its own; `None` only when the text is not an object.
pub fn parse_patch(text: &str) -> Option<Patch> {
    let value: Value = serde_json::from_str(text).ok()?;
    patch_from_value(&value)
}

fn patch_from_value(value: &Value) -> Option<Patch> {
    let obj = value.as_object()?;
    Some(Patch {
        shots: field_shots(obj),
        delay_ms: field_delay(obj),
        phase: field_phase(obj),
    })
}

fn field_shots(obj: &Map<String, Value>) -> Option<ShotBudget> {
    let v = obj.get("numberOfShots")?;
    let n = match v.as_i64() {
        Some(n) => n,
        None => {
            let f = v.as_f64()?;
            if f.fract() != 0.0 || !f.is_finite() {
                return None;
            }
            f as i64
        }
    };
    ShotBudget::from_count(n)
}

fn field_delay(obj: &Map<String, Value>) -> Option<f64> {
    let d = obj.get("delayBetweenShots")?.as_f64()?;
    (d.is_finite() && d >= 0.0).then_some(d)
}

fn field_phase(obj: &Map<String, Value>) -> Option<Phase> {
    match obj.get("state")?.as_str()? {
        "start" => Some(Phase::Starting),
        "idle" => Some(Phase::Idle),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("status", Some(Command::Status))]
    #[case("  on\n", Some(Command::Start))]
    #[case("start", Some(Command::Start))]
    #[case("off", Some(Command::Stop))]
    #[case("stop", Some(Command::Stop))]
    #[case("os", Some(Command::SingleShot))]
    #[case("single-shot", Some(Command::SingleShot))]
    #[case("turn on", None)]
    #[case("STATUS", None)]
    #[case("", None)]
    #[case("{not json", None)]
    #[case("[1,2]", None)]
    fn strict_keywords(#[case] msg: &str, #[case] expected: Option<Command>) {
        assert_eq!(parse_strict(msg), expected);
    }

    #[test]
    fn strict_patch_with_all_fields() {
        let cmd = parse_strict(r#"{"numberOfShots":3,"delayBetweenShots":500,"state":"start"}"#);
        assert_eq!(
            cmd,
            Some(Command::Patch(Patch {
                shots: Some(ShotBudget::Remaining(3)),
                delay_ms: Some(500.0),
                phase: Some(Phase::Starting),
            }))
        );
    }

    #[rstest]
    #[case(r#"{"numberOfShots":-1}"#, Some(ShotBudget::Unlimited))]
    #[case(r#"{"numberOfShots":2.0}"#, Some(ShotBudget::Remaining(2)))]
    #[case(r#"{"numberOfShots":2.5}"#, None)]
    #[case(r#"{"numberOfShots":-4}"#, None)]
    #[case(r#"{"numberOfShots":"3"}"#, None)]
    #[case(r#"{"numberOfShots":4294967296}"#, None)]
    #[case(r#"{"numberOfShots":1e12}"#, None)]
    fn shots_field_validation(#[case] msg: &str, #[case] expected: Option<ShotBudget>) {
        let patch = parse_patch(msg).expect("object");
        assert_eq!(patch.shots, expected);
    }

    #[rstest]
    #[case(r#"{"delayBetweenShots":12.5}"#, Some(12.5))]
    #[case(r#"{"delayBetweenShots":0}"#, Some(0.0))]
    #[case(r#"{"delayBetweenShots":-1}"#, None)]
    #[case(r#"{"delayBetweenShots":null}"#, None)]
    fn delay_field_validation(#[case] msg: &str, #[case] expected: Option<f64>) {
        assert_eq!(parse_patch(msg).expect("object").delay_ms, expected);
    }

    #[test]
    fn state_field_is_restricted() {
        assert_eq!(
            parse_patch(r#"{"state":"idle"}"#).unwrap().phase,
            Some(Phase::Idle)
        );
        assert_eq!(parse_patch(r#"{"state":"cooling"}"#).unwrap().phase, None);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let patch = parse_patch(r#"{"colour":"red","numberOfShots":1}"#).unwrap();
        assert_eq!(patch.shots, Some(ShotBudget::Remaining(1)));
        assert!(patch.delay_ms.is_none());
    }

    #[test]
    fn legacy_matches_in_fixed_order() {
        assert_eq!(parse_legacy("os"), vec![Command::SingleShot]);
        assert_eq!(parse_legacy("status"), vec![Command::Status]);
        // "button" contains "on"; substring semantics accept it
        assert_eq!(parse_legacy("button"), vec![Command::Start]);
        // "on" then "off" both match
        assert_eq!(parse_legacy("on/off"), vec![Command::Start, Command::Stop]);
    }

    #[test]
    fn legacy_broken_json_yields_empty_patch() {
        assert_eq!(
            parse_legacy("{garbage"),
            vec![Command::Patch(Patch::default())]
        );
    }

    #[test]
    fn legacy_patch_stops_after_the_first_json_value() {
        assert_eq!(
            parse_legacy(r#"{"numberOfShots":2} on"#),
            vec![
                Command::Patch(Patch {
                    shots: Some(ShotBudget::Remaining(2)),
                    ..Patch::default()
                }),
                Command::Start,
            ]
        );
    }

    #[test]
    fn strict_patch_rejects_trailing_text() {
        assert_eq!(parse_strict(r#"{"numberOfShots":2} on"#), None);
    }

    #[test]
    fn legacy_patch_keys_do_not_collide_with_keywords() {
        let cmds = parse_legacy(r#"{"numberOfShots":3,"delayBetweenShots":500}"#);
        assert_eq!(cmds.len(), 1);
        assert!(matches!(cmds[0], Command::Patch(_)));
    }

    #[test]
    fn dialect_dispatch() {
        assert!(parse("turn on", Dialect::Strict).is_empty());
        assert_eq!(parse("turn on", Dialect::Legacy), vec![Command::Start]);
    }
}
