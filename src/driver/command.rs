use crate::record::Record;
use crate::types::RowValues;

/// How the command text is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandKind {
    /// Raw SQL.
    #[default]
    Text,
    /// The text is a stored-procedure name.
    StoredProcedure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamDirection {
    #[default]
    Input,
    /// Receives the procedure's integer return value.
    ReturnValue,
}

/// A single bound parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// `None` for purely positional values.
    pub name: Option<String>,
    pub value: RowValues,
    pub direction: ParamDirection,
}

impl Param {
    #[must_use]
    pub fn positional(value: RowValues) -> Self {
        Self {
            name: None,
            value,
            direction: ParamDirection::Input,
        }
    }

    #[must_use]
    pub fn named(name: impl Into<String>, value: RowValues) -> Self {
        Self {
            name: Some(name.into()),
            value,
            direction: ParamDirection::Input,
        }
    }

    /// 32-bit return-value slot.
    #[must_use]
    pub fn return_value(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            value: RowValues::Null,
            direction: ParamDirection::ReturnValue,
        }
    }

    #[must_use]
    pub fn is_input(&self) -> bool {
        self.direction == ParamDirection::Input
    }
}

/// Parameter set accepted by the engine's raw-SQL and procedure helpers.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Params {
    #[default]
    None,
    Named(Record),
    Positional(Vec<RowValues>),
}

impl From<()> for Params {
    fn from((): ()) -> Self {
        Params::None
    }
}

impl From<Record> for Params {
    fn from(record: Record) -> Self {
        Params::Named(record)
    }
}

impl From<Vec<RowValues>> for Params {
    fn from(values: Vec<RowValues>) -> Self {
        Params::Positional(values)
    }
}

/// A statement ready to run on a connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub text: String,
    pub kind: CommandKind,
    pub params: Vec<Param>,
}

impl Command {
    #[must_use]
    pub fn new(text: impl Into<String>, kind: CommandKind) -> Self {
        Self {
            text: text.into(),
            kind,
            params: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Input parameters in binding order.
    pub fn inputs(&self) -> impl Iterator<Item = &Param> {
        self.params.iter().filter(|p| p.is_input())
    }

    /// The registered return-value parameter, if any.
    #[must_use]
    pub fn return_param(&self) -> Option<&Param> {
        self.params
            .iter()
            .find(|p| p.direction == ParamDirection::ReturnValue)
    }

    /// Names used for placeholder translation; positional inputs contribute an empty name.
    #[must_use]
    pub fn input_names(&self) -> Vec<&str> {
        self.inputs()
            .map(|p| p.name.as_deref().unwrap_or_default())
            .collect()
    }
}
