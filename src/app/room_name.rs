pub const MAX_ROOM_NAME_LENGTH: usize = 64;

/// Room ids keep only ASCII letters, digits, `-` and `_`, up to
/// `MAX_ROOM_NAME_LENGTH` of them. An empty result means no usable room id.
pub fn sanitize_room_name(value: &str) -> String {
    let mut cleaned = String::with_capacity(value.len().min(MAX_ROOM_NAME_LENGTH));
    for ch in value.chars() {
        if cleaned.len() >= MAX_ROOM_NAME_LENGTH {
            break;
        }
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
            cleaned.push(ch);
        }
    }
    cleaned
}
