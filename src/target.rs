use std::fmt::Display;

/// A target split into its scheme, authority and path.
///
/// `scheme://authority/path` and `scheme:path` are recognised when `scheme`
/// is known; anything else is a path under the default scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub scheme: String,
    pub authority: Option<String>,
    pub path: String,
}

fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

impl Target {
    pub fn new(scheme: &str, authority: Option<&str>, path: &str) -> Self {
        Self {
            scheme: scheme.to_owned(),
            authority: authority.map(ToOwned::to_owned),
            path: path.to_owned(),
        }
    }

    /// Splits `target`, never failing.
    ///
    /// `is_known` is asked about lowercased scheme candidates. Targets without
    /// a known scheme get `default_scheme`, or an empty scheme without one.
    pub fn parse(
        target: &str,
        is_known: impl Fn(&str) -> bool,
        default_scheme: Option<&str>,
    ) -> Self {
        if let Some((scheme, rest)) = target.split_once(':') {
            let scheme = scheme.to_ascii_lowercase();
            if is_valid_scheme(&scheme) && is_known(&scheme) {
                return match rest.strip_prefix("//") {
                    Some(rest) => {
                        let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
                        Target::new(&scheme, Some(authority), path)
                    }
                    None => Target::new(&scheme, None, rest),
                };
            }
        }

        Target::new(default_scheme.unwrap_or_default(), None, target)
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.authority, self.scheme.is_empty()) {
            (Some(authority), _) => write!(f, "{}://{}/{}", self.scheme, authority, self.path),
            (None, true) => write!(f, "{}", self.path),
            (None, false) => write!(f, "{}:{}", self.scheme, self.path),
        }
    }
}
