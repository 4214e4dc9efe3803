use sha2::{Digest, Sha256};

const MAX_TOKEN_PREFIX: usize = 64;
const DIGEST_HEX_LEN: usize = 12;

/// Map an untrusted task id to a filesystem-safe token.
///
/// Characters outside `[A-Za-z0-9_-]` become `-`, which removes every `.` and path
/// separator. When the id had to be rewritten or shortened, a digest of the raw id
/// is appended so that distinct ids never share a file. The mapping is pure, so every
/// store, load and delete path resolves an id to the same token.
pub fn sanitize_task_id(task_id: &str) -> String {
    let replaced: String = task_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();

    if replaced == task_id && replaced.len() <= MAX_TOKEN_PREFIX && !replaced.is_empty() {
        return replaced;
    }

    let prefix: String = replaced.chars().take(MAX_TOKEN_PREFIX).collect();
    let digest = hex::encode(Sha256::digest(task_id.as_bytes()));
    format!("{prefix}-{}", &digest[..DIGEST_HEX_LEN])
}
