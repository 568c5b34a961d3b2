mod account;
mod body;
mod daily;
mod helpers;
mod logs;
mod target;
mod workout;

pub(crate) use account::{
    cmd_account_claim, cmd_account_coins, cmd_account_login, cmd_account_logout,
    cmd_account_show, cmd_account_sign_in, cmd_account_tasks,
};
pub(crate) use body::{
    cmd_body_delete, cmd_body_list, cmd_body_log, cmd_body_metrics, cmd_body_update,
};
pub(crate) use daily::{
    cmd_daily_month, cmd_daily_reading, cmd_daily_record, cmd_daily_show, cmd_daily_week,
};
pub(crate) use logs::{
    LogKind, cmd_bowel_log, cmd_bowel_update, cmd_log_delete, cmd_log_list, cmd_mood_log,
    cmd_mood_update, cmd_period_list, cmd_period_log, cmd_period_update, cmd_sleep_log,
    cmd_sleep_update, cmd_water_log, cmd_water_update,
};
pub(crate) use target::{cmd_target_set, cmd_target_show};
pub(crate) use workout::{cmd_workout_delete, cmd_workout_list, cmd_workout_log, cmd_workout_totals};
