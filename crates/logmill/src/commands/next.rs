//! Next command - upcoming trigger times of a cron expression

use anyhow::Result;
use chrono::Utc;
use logmill_writer::RotationSchedule;

use crate::cli::NextArgs;
use crate::output::print_schedule;

pub fn execute(args: &NextArgs) -> Result<()> {
    let local_time = !args.utc;
    let schedule = RotationSchedule::parse(&args.expression, local_time)?;
    let times = schedule.upcoming(Utc::now(), args.count);

    print_schedule(schedule.expression(), &times, local_time);
    Ok(())
}
