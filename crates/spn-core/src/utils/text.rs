//! Fixed-width text for progress display.

/// Truncate or right-pad `text` to exactly `width` characters.
///
/// Only the first line is kept; truncated text ends in `…`.
pub fn fit_width(text: &str, width: usize) -> String {
    let line = text.lines().next().unwrap_or("").trim_end();
    let count = line.chars().count();

    if count <= width {
        let mut fitted = String::with_capacity(width);
        fitted.push_str(line);
        fitted.extend(std::iter::repeat(' ').take(width - count));
        return fitted;
    }

    if width == 0 {
        return String::new();
    }
    let mut fitted: String = line.chars().take(width - 1).collect();
    fitted.push('…');
    fitted
}
