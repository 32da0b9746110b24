/// Match an environment-style value against a list of named choices, ignoring case and surrounding whitespace.
///
/// Returns `None` if the value is missing or unrecognised, so the caller can log and fall back to its default.
pub fn parse_choice<T: Copy>(value: Option<&str>, choices: &[(&str, T)]) -> Option<T> {
    let value = value?.trim().to_ascii_lowercase();
    choices.iter().find(|(name, _)| *name == value).map(|(_, v)| *v)
}
