//! Pure helpers for continuing truncated model replies.
//!
//! When a reply stops on the token limit, the next request is primed with a
//! short assistant prefill taken from the end of the previous chunk, and the
//! chunks are stitched back together by dropping each chunk's (possibly
//! partial) last line before appending the next one.

/// User message sent after a truncated reply.
pub const CONTINUE_PROMPT: &str = "Continue the code conversion from where you left off.";

/// Assistant prefill for the next continuation request.
///
/// Takes the second- and third-to-last lines of `reply` (the last line is
/// assumed partial), joined and trimmed. Replies with fewer than three lines
/// contribute only the lines strictly between the first and the last.
pub fn continuation_prefill(reply: &str) -> String {
    let parts: Vec<&str> = reply.rsplitn(4, '\n').collect();
    if parts.len() < 3 {
        return String::new();
    }
    let middle: Vec<&str> = parts[1..parts.len() - 1].iter().rev().copied().collect();
    middle.join("\n").trim().to_string()
}

/// Join continuation chunks into a single reply.
pub fn stitch_chunks<S: AsRef<str>>(chunks: &[S]) -> String {
    let mut iter = chunks.iter();
    let Some(first) = iter.next() else {
        return String::new();
    };
    let mut stitched = first.as_ref().to_string();
    for chunk in iter {
        let keep = stitched.rfind('\n').unwrap_or(stitched.len());
        stitched.truncate(keep);
        stitched.push_str(chunk.as_ref());
    }
    stitched
}
