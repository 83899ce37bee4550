pub const STEP_VIEW: &str = "step.view";
pub const STEP_MANAGE: &str = "step.manage";
pub const ALERT_VIEW: &str = "alert.view";
pub const ALERT_EDIT: &str = "alert.edit";
pub const ALERT_CHANGE_STEP: &str = "alert.change_step";
pub const CASE_VIEW: &str = "case.view";
pub const CASE_EDIT: &str = "case.edit";
pub const CASE_CHANGE_STEP: &str = "case.change_step";

pub const ALL: [&str; 8] = [
    STEP_VIEW,
    STEP_MANAGE,
    ALERT_VIEW,
    ALERT_EDIT,
    ALERT_CHANGE_STEP,
    CASE_VIEW,
    CASE_EDIT,
    CASE_CHANGE_STEP,
];
