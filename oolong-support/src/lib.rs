use std::fmt;

/// Frame a failure message with the source position that triggered it.
///
/// This is the framing every compiler error renders with; tooling that
/// surfaces expression errors to end users parses it, and hosts composing
/// their own diagnostics use this helper to match it exactly.
pub fn position_message(offset: usize, message: impl fmt::Display) -> String {
    format!("position {offset} near: {message}")
}

/// Join a list of signature descriptions for overload diagnostics,
/// e.g. `(Int, Int) or (Double, Double)`.
pub fn describe_candidates(candidates: &[String]) -> String {
    match candidates {
        [] => String::from("none"),
        [single] => single.clone(),
        [init @ .., last] => format!("{} or {}", init.join(", "), last),
    }
}

/// Render a caret marker line pointing at `offset` within `source`.
///
/// Expressions are single logical lines, so the marker is a plain
/// column indicator under the echoed source text.
pub fn caret_line(source: &str, offset: usize) -> String {
    let column = source
        .char_indices()
        .take_while(|(index, _)| *index < offset)
        .count();
    format!("{}^", " ".repeat(column))
}
