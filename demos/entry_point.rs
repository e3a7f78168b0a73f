//! Calls `then_exit_if_entry_point_action` straight from `main`, which makes
//! it the entry point: the process ends inside that call.

#![deny(missing_docs)]

fn main() -> Result<(), failure::Error> {
    execute::logging::setup(log::LevelFilter::Info, None)?;
    let fail = std::env::args().nth(1).map_or(false, |arg| arg == "fail");

    execute::then_exit_if_entry_point_action(|| {
        if fail {
            Err(failure::err_msg("asked to fail"))
        } else {
            Ok(())
        }
    })?;

    println!("main kept running");
    Ok(())
}
