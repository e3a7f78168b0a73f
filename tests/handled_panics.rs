//! Runs through the real `System`, so the installed panic hook sees every
//! panic the runner catches.

use execute::{Destination, RunOptions, System, Task};
use log::{Log, Metadata, Record};

use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Capture {
    messages: Mutex<Vec<String>>,
}

impl Log for Capture {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        self.messages.lock().unwrap().push(record.args().to_string());
    }

    fn flush(&self) {}
}

struct Exploding;

impl Log for Exploding {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, _: &Record) {
        panic!("log sink exploded");
    }

    fn flush(&self) {}
}

#[test]
fn exploding_sink_fails_the_task_without_aborting() {
    let options = RunOptions::builder("handled_panics", "exploding_sink")
        .destination(Destination::custom(Exploding))
        .build()
        .unwrap();
    let mut ran = false;

    let result = execute::run::<()>(
        Task::action(|| {
            ran = true;
            Ok(())
        }),
        &options,
        &System,
    );

    assert!(!ran);
    let err = result.unwrap_err();
    assert_eq!(
        err.task_failure().unwrap().to_string(),
        "task panicked: log sink exploded"
    );
}

#[test]
fn panicking_task_is_not_reported_as_uncaught() {
    let capture = Arc::new(Capture::default());
    let options = RunOptions::builder("handled_panics", "panicking_task")
        .destination(Destination::Custom(capture.clone()))
        .build()
        .unwrap();

    let result: execute::Result<Option<u8>> =
        execute::run(Task::call(|| panic!("handled by the runner")), &options, &System);

    assert!(result.is_err());
    let messages = capture.messages.lock().unwrap().clone();
    assert!(!messages.iter().any(|m| m.contains("UNCAUGHT")), "{:#?}", messages);
    assert!(messages
        .iter()
        .any(|m| m.starts_with("panicking_task: task stop date = ")));
}
