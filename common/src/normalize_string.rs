pub trait NormalizeString {
    /// Normalizes line endings to `\n` and guarantees a trailing `\n`.
    fn normalize(&self) -> String;
}

impl NormalizeString for str {
    fn normalize(&self) -> String {
        let mut out = if self.contains('\r') {
            self.replace("\r\n", "\n").replace('\r', "\n")
        } else {
            self.to_string()
        };
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out
    }
}

impl NormalizeString for String {
    fn normalize(&self) -> String {
        self.as_str().normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_trailing_newline() {
        assert_eq!("a\tb".normalize(), "a\tb\n");
        assert_eq!("a\tb\n".normalize(), "a\tb\n");
        assert_eq!("".normalize(), "\n");
    }

    #[test]
    fn converts_carriage_returns() {
        assert_eq!("a\r\nb\rc".normalize(), "a\nb\nc\n");
        assert_eq!(String::from("row\r\n").normalize(), "row\n");
    }
}
