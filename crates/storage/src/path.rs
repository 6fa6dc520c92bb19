/// Drop a leading `"<bucket>/"` from an object path
///
/// Callers sometimes pass the full storage key including the bucket name,
/// which would otherwise resolve to `raw/raw/...`.
pub fn strip_bucket_prefix<'a>(path: &'a str, bucket: &str) -> &'a str {
    let path = path.trim_start_matches('/');
    path.strip_prefix(bucket)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(path)
}

/// Join an object prefix and a name with exactly one `/`
pub fn join_object_path(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_bucket_prefix() {
        assert_eq!(strip_bucket_prefix("raw/user/a.webm", "raw"), "user/a.webm");
        assert_eq!(strip_bucket_prefix("/raw/user/a.webm", "raw"), "user/a.webm");
        assert_eq!(strip_bucket_prefix("user/a.webm", "raw"), "user/a.webm");
        // Only a whole leading segment counts
        assert_eq!(strip_bucket_prefix("rawfiles/a.webm", "raw"), "rawfiles/a.webm");
    }

    #[test]
    fn test_join_object_path() {
        assert_eq!(join_object_path("user/42", "master.m3u8"), "user/42/master.m3u8");
        assert_eq!(join_object_path("user/42/", "/master0.ts"), "user/42/master0.ts");
        assert_eq!(join_object_path("", "transcript.json"), "transcript.json");
    }
}
