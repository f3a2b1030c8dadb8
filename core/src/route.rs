//! The retrieval route: a closed sum type so the downgrade rule is
//! exhaustive in code. The route is assigned exactly twice per request
//! (post-analysis, post-extract) and read once, at `QueryBuilder`.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Including,
    Without,
    Personal,
    Memory,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Including => "including",
            Route::Without => "without",
            Route::Personal => "personal",
            Route::Memory => "memory",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Route {
    type Err = ();

    /// Parses a raw LLM completion into a route. Anything that is not
    /// exactly one of the four known names is rejected here; callers coerce
    /// the rejection to [`Route::Without`] per the safe-fallback rule.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "including" => Ok(Route::Including),
            "without" => Ok(Route::Without),
            "personal" => Ok(Route::Personal),
            "memory" => Ok(Route::Memory),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_display_and_from_str() {
        for route in [Route::Including, Route::Without, Route::Personal, Route::Memory] {
            assert_eq!(route.to_string().parse::<Route>().unwrap(), route);
        }
    }

    #[test]
    fn unknown_text_does_not_parse() {
        assert!("garbage".parse::<Route>().is_err());
    }
}
