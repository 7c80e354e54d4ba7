use strum::{Display, EnumIter, EnumString};

/// How a caller computes the static link it passes to a callee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum StaticLinkStrategy {
    /// Follow the caller's static links up to the frame enclosing the callee.
    /// Top level functions receive 0.
    #[default]
    Chain,
    /// Always pass 0. Nested functions cannot reach the frames of the
    /// functions that enclose them.
    ConstantZero,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
    pub static_link: StaticLinkStrategy,
}

impl CompileOptions {
    pub fn with_static_link(mut self, static_link: StaticLinkStrategy) -> Self {
        self.static_link = static_link;
        self
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn strategies_use_kebab_case_names() {
        assert_eq!(StaticLinkStrategy::Chain.to_string(), "chain");
        assert_eq!(
            StaticLinkStrategy::from_str("constant-zero"),
            Ok(StaticLinkStrategy::ConstantZero)
        );
        assert!(StaticLinkStrategy::from_str("ConstantZero").is_err());
    }

    #[test]
    fn chain_is_the_default() {
        assert_eq!(
            CompileOptions::default().static_link,
            StaticLinkStrategy::Chain
        );
    }
}
