use std::fmt;

/// One forwarded tool argument: a canonical option name and its value, if it takes one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub value: Option<String>,
}

impl Param {
    pub fn flag(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

/// Arguments forwarded to the real tool, in command-line order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamList(Vec<Param>);

impl ParamList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, param: Param) {
        self.0.push(param);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Param> {
        self.0.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.0.iter()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|param| param.name == name)
    }

    /// Replaces the value at `index`; out-of-range indexes are ignored.
    pub fn set_value(&mut self, index: usize, value: impl Into<String>) {
        if let Some(param) = self.0.get_mut(index) {
            param.value = Some(value.into());
        }
    }

    /// Flattens into argv words: each name followed by its value when present.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.0.len() * 2);
        for param in &self.0 {
            args.push(param.name.clone());
            if let Some(value) = &param.value {
                args.push(value.clone());
            }
        }
        args
    }
}

impl FromIterator<Param> for ParamList {
    fn from_iter<T: IntoIterator<Item = Param>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for ParamList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_args().join(" "))
    }
}
