use std::fmt::Write;

/// Support level of one MLSx fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FactState {
    #[default]
    Unsupported,
    Supported,
    Active,
}

/// Facts announced in FEAT, in announcement order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fact {
    Size,
    Modify,
    Type,
    Perm,
    Create,
    Unique,
    Lang,
    MediaType,
    Charset,
}

pub const ALL_FACTS: [Fact; 9] = [
    Fact::Size,
    Fact::Modify,
    Fact::Type,
    Fact::Perm,
    Fact::Create,
    Fact::Unique,
    Fact::Lang,
    Fact::MediaType,
    Fact::Charset,
];

impl Fact {
    pub fn name(&self) -> &'static str {
        match self {
            Fact::Size => "Size",
            Fact::Modify => "Modify",
            Fact::Type => "Type",
            Fact::Perm => "Perm",
            Fact::Create => "Create",
            Fact::Unique => "Unique",
            Fact::Lang => "Lang",
            Fact::MediaType => "Media-Type",
            Fact::Charset => "Charset",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// MLSx options of a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptsMlsx {
    states: [FactState; 9],
}

impl OptsMlsx {
    /// Every fact unsupported.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options of a filesystem directory: size, modify, type and perm active.
    pub fn for_directory() -> Self {
        let mut opts = Self::new();
        for fact in [Fact::Size, Fact::Modify, Fact::Type, Fact::Perm] {
            opts.set(fact, FactState::Active);
        }
        opts
    }

    pub fn state(&self, fact: Fact) -> FactState {
        self.states[fact.index()]
    }

    pub fn set(&mut self, fact: Fact, state: FactState) {
        self.states[fact.index()] = state;
    }

    pub fn is_active(&self, fact: Fact) -> bool {
        self.state(fact) == FactState::Active
    }

    /// FEAT line body, e.g. ` Size*;Modify*;Type*;Perm*;UNIX.mode;`.
    pub fn feat(&self) -> String {
        let mut feat = String::from(" ");
        for fact in ALL_FACTS {
            match self.state(fact) {
                FactState::Unsupported => {}
                FactState::Supported => {
                    let _ = write!(feat, "{};", fact.name());
                }
                FactState::Active => {
                    let _ = write!(feat, "{}*;", fact.name());
                }
            }
        }
        feat.push_str("UNIX.mode;");
        feat
    }

    /// Applies an `OPTS MLST` fact list such as `size;type;`.
    ///
    /// Supported facts named in the list become active, the others become
    /// inactive. Returns the accepted facts in the reply format.
    pub fn apply_opts(&mut self, requested: &str) -> String {
        let wanted: Vec<String> = requested
            .split(';')
            .map(|f| f.trim().to_ascii_lowercase())
            .filter(|f| !f.is_empty())
            .collect();
        let mut accepted = String::new();
        for fact in ALL_FACTS {
            if self.state(fact) == FactState::Unsupported {
                continue;
            }
            if wanted.iter().any(|w| w.eq_ignore_ascii_case(fact.name())) {
                self.set(fact, FactState::Active);
                let _ = write!(accepted, "{};", fact.name());
            } else {
                self.set(fact, FactState::Supported);
            }
        }
        accepted
    }
}
