//! URL path canonicalization.

/// Cleans `path` into its canonical rooted form.
///
/// The result always starts with `/`, never ends with one (except for the
/// root itself), contains no empty, `.` or `..` segments, and never climbs
/// above the root: `/../a` cleans to `/a`.
///
/// ```rust
/// assert_eq!(stiff::clean_path("/blog//2024/./posts/../"), "/blog/2024");
/// assert_eq!(stiff::clean_path("about"), "/about");
/// ```
pub fn clean_path(path: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            _ => stack.push(segment),
        }
    }

    let mut cleaned = String::with_capacity(path.len() + 1);
    cleaned.push('/');
    cleaned.push_str(&stack.join("/"));
    cleaned
}
