use std::collections::HashMap;

use super::transcript_models::{ExternalParticipant, InternalUser, PersonId, TranscriptTurn};

const INTERNAL_FALLBACK: &str = "Internal User";
const EXTERNAL_FALLBACK: &str = "External Participant";
const UNKNOWN_SPEAKER: &str = "Unknown Speaker";

/// Display name for an email address: everything before the `@`.
fn local_part(email: Option<&str>) -> Option<&str> {
    email
        .filter(|e| !e.is_empty())
        .map(|e| e.split('@').next().unwrap_or(e))
}

fn speaker_map<'a>(
    users: &'a [InternalUser],
    external: &'a [ExternalParticipant],
) -> HashMap<&'a PersonId, &'a str> {
    let mut speakers = HashMap::new();

    for user in users {
        if let Some(id) = &user.person_id {
            let name = local_part(user.user_email.as_deref()).unwrap_or(INTERNAL_FALLBACK);
            speakers.insert(id, name);
        }
    }

    // External entries win when an id shows up in both lists.
    for participant in external {
        if let Some(id) = &participant.person_id {
            let name = local_part(participant.email.as_deref()).unwrap_or(EXTERNAL_FALLBACK);
            speakers.insert(id, name);
        }
    }

    speakers
}

/// Rebuild a readable transcript from turn-tagged utterances.
///
/// Consecutive turns by the same speaker are merged into one block:
///
/// ```text
/// sam:
/// Thanks for joining.
/// Shall we start?
///
/// kim:
/// Sure.
/// ```
pub fn build_transcript(
    turns: &[TranscriptTurn],
    users: &[InternalUser],
    external: &[ExternalParticipant],
) -> String {
    if turns.is_empty() {
        return String::new();
    }

    let speakers = speaker_map(users, external);
    let name_of = |id: Option<&PersonId>| {
        id.and_then(|id| speakers.get(id).copied())
            .unwrap_or(UNKNOWN_SPEAKER)
    };

    let mut blocks: Vec<String> = Vec::new();
    let mut current = turns[0].person_id.as_ref();
    let mut lines = vec![turns[0].text()];

    for turn in &turns[1..] {
        let speaker = turn.person_id.as_ref();
        if speaker == current {
            lines.push(turn.text());
            continue;
        }
        blocks.push(format!("{}:\n{}", name_of(current), lines.join("\n")));
        current = speaker;
        lines = vec![turn.text()];
    }
    blocks.push(format!("{}:\n{}", name_of(current), lines.join("\n")));

    blocks.join("\n\n")
}

/// Very short calls are not worth summarizing.
pub fn is_too_short(transcript: &str, min_words: usize) -> bool {
    transcript.trim().split(' ').count() < min_words
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(id: i64, text: &str) -> TranscriptTurn {
        TranscriptTurn {
            person_id: Some(PersonId::Number(id)),
            text: Some(text.to_string()),
        }
    }

    fn user(id: i64, email: Option<&str>) -> InternalUser {
        InternalUser {
            person_id: Some(PersonId::Number(id)),
            user_email: email.map(str::to_string),
        }
    }

    fn guest(id: i64, email: Option<&str>) -> ExternalParticipant {
        ExternalParticipant {
            person_id: Some(PersonId::Number(id)),
            email: email.map(str::to_string),
        }
    }

    #[test]
    fn groups_consecutive_turns_by_speaker() {
        let turns = vec![
            turn(1, "Thanks for joining."),
            turn(1, "Shall we start?"),
            turn(2, "Sure."),
            turn(1, "Great."),
        ];
        let users = vec![user(1, Some("sam@example.com"))];
        let guests = vec![guest(2, Some("kim@client.com"))];

        let text = build_transcript(&turns, &users, &guests);

        assert_eq!(
            text,
            "sam:\nThanks for joining.\nShall we start?\n\nkim:\nSure.\n\nsam:\nGreat."
        );
    }

    #[test]
    fn empty_transcript_is_empty_string() {
        assert_eq!(build_transcript(&[], &[user(1, None)], &[]), "");
    }

    #[test]
    fn fallback_names() {
        let turns = vec![turn(1, "a"), turn(2, "b"), turn(3, "c")];
        let users = vec![user(1, None)];
        let guests = vec![guest(2, Some(""))];

        let text = build_transcript(&turns, &users, &guests);

        assert_eq!(
            text,
            "Internal User:\na\n\nExternal Participant:\nb\n\nUnknown Speaker:\nc"
        );
    }

    #[test]
    fn external_participant_overrides_user_with_same_id() {
        let turns = vec![turn(5, "hello")];
        let users = vec![user(5, Some("inside@example.com"))];
        let guests = vec![guest(5, Some("outside@client.com"))];

        assert_eq!(build_transcript(&turns, &users, &guests), "outside:\nhello");
    }

    #[test]
    fn short_transcripts_are_detected_by_space_count() {
        assert!(is_too_short("", 10));
        assert!(is_too_short("sam:\none two three", 10));
        assert!(!is_too_short("one two three four five six seven eight nine ten", 10));
    }
}
