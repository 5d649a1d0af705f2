//! Application error type.
//!
//! Every aborting failure carries:
//! - a kind (what went wrong, drives the exit code)
//! - the pipeline stage it happened in
//! - the input it concerns (file name, energy bin, dataset label)
//!
//! Many datasets are processed per run, so the rendered message always names
//! the stage and the input when they are known.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad flags or calibration settings.
    Config,
    /// File could not be opened, read or written.
    Io,
    /// Malformed or empty histogram/table, empty curve, misaligned series.
    DataShape,
    /// The nonlinear solver failed or produced an unusable covariance.
    FitConvergence,
    /// Inversion requested at or beyond the response asymptote.
    Domain,
}

impl ErrorKind {
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::Config | ErrorKind::Io => 2,
            ErrorKind::DataShape => 3,
            ErrorKind::FitConvergence => 4,
            ErrorKind::Domain => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ingest,
    Reduction,
    Fitting,
    Calibration,
    Correction,
    Inversion,
    Export,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Ingest => "ingest",
            Stage::Reduction => "reduction",
            Stage::Fitting => "fitting",
            Stage::Calibration => "calibration",
            Stage::Correction => "correction",
            Stage::Inversion => "inversion",
            Stage::Export => "export",
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    kind: ErrorKind,
    stage: Option<Stage>,
    input: Option<String>,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            stage: None,
            input: None,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    pub fn data_shape(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DataShape, message)
    }

    pub fn fit_convergence(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FitConvergence, message)
    }

    pub fn domain(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Domain, message)
    }

    /// Attach the stage, keeping an already-set one (the innermost wins).
    pub fn at(mut self, stage: Stage) -> Self {
        self.stage.get_or_insert(stage);
        self
    }

    /// Attach the input label, keeping an already-set one.
    pub fn for_input(mut self, input: impl Into<String>) -> Self {
        if self.input.is_none() {
            self.input = Some(input.into());
        }
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn stage(&self) -> Option<Stage> {
        self.stage
    }

    pub fn input(&self) -> Option<&str> {
        self.input.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn exit_code(&self) -> u8 {
        self.kind.exit_code()
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(stage) = self.stage {
            write!(f, "[{}] ", stage.label())?;
        }
        if let Some(input) = &self.input {
            write!(f, "{input}: ")?;
        }
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("kind", &self.kind)
            .field("stage", &self.stage)
            .field("input", &self.input)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
