//! Generate a stats snapshot from a synthetic 30-day program

use chrono::NaiveDate;
use tindex::types::TaskId;
use tindex::UserProgram;

fn main() {
    let start = NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date");
    let mut program = UserProgram::new("demo-user", start);

    for offset in 0..30u64 {
        let date = start + chrono::Days::new(offset);
        // Trains five days out of six, sleeps well most nights
        if offset % 6 != 5 {
            program.upsert_progress(TaskId::Exercise, date, 100.0);
        }
        program.upsert_progress(TaskId::Sleep, date, if offset % 4 == 0 { 75.0 } else { 100.0 });
        program.upsert_progress(TaskId::SunExposure, date, 100.0);
        if offset % 7 == 6 {
            program.upsert_progress(TaskId::Alcohol, date, 30.0);
        }
    }

    let today = start + chrono::Days::new(29);
    let snapshot = tindex::compute_statistics(&program, today);
    match serde_json::to_string_pretty(&snapshot) {
        Ok(json) => print!("{json}"),
        Err(e) => eprintln!("Error: {e:?}"),
    }
}
