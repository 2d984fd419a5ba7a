/// Replaces each placeholder with its value in a single left-to-right pass.
/// Substituted text is never scanned again, so a value that looks like a
/// placeholder is copied literally whatever the order of `substitutions`.
pub fn fill(template: &str, substitutions: &[(&str, &str)]) -> String {
    let mut text = String::with_capacity(template.len());
    let mut rest = template;

    while !rest.is_empty() {
        let found = substitutions
            .iter()
            .filter(|(placeholder, _)| !placeholder.is_empty())
            .find(|(placeholder, _)| rest.starts_with(placeholder));

        match found {
            Some((placeholder, value)) => {
                text.push_str(value);
                rest = &rest[placeholder.len()..];
            }
            None => {
                let Some(ch) = rest.chars().next() else { break };
                text.push(ch);
                rest = &rest[ch.len_utf8()..];
            }
        }
    }

    text
}
