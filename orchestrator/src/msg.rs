use machine_learning::MlErr;

/// What the coordinator tells a worker.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Parameters for the next batch, the worker starts pulling chunks once it has them.
    Params(Vec<f64>),
    /// Stop the worker loop.
    Finished,
}

/// What a worker computed for one batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partial {
    /// Error of every sequence the worker processed.
    pub errors: Vec<f64>,
    /// Ponderation of every sequence the worker processed.
    pub ponderations: Vec<f64>,
    /// Sum of the derivatives of every sequence the worker processed.
    pub derivs: Vec<f64>,
}

/// What a worker answers to a `Command::Params`.
#[derive(Debug)]
pub enum Report {
    Done(Partial),
    Failed(MlErr),
}
