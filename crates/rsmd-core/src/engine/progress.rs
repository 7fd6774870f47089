#[derive(Debug, Clone)]
pub enum Progress {
    RunStart { first_cycle: usize, last_cycle: usize },
    CycleStart { cycle: usize },
    StepFinished {
        cycle: usize,
        candidates: usize,
        outcome: &'static str,
    },
    CycleFinish { cycle: usize },
    RunFinish,

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn reporter_without_callback_ignores_events() {
        ProgressReporter::new().report(Progress::RunFinish);
    }

    #[test]
    fn reporter_forwards_events_to_callback() {
        let seen = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::CycleStart { cycle } = event {
                seen.lock().unwrap().push(cycle);
            }
        }));
        reporter.report(Progress::CycleStart { cycle: 3 });
        reporter.report(Progress::Message("ignored".to_string()));
        reporter.report(Progress::CycleStart { cycle: 4 });
        drop(reporter);
        assert_eq!(seen.into_inner().unwrap(), vec![3, 4]);
    }
}
