pub mod deduction;
pub mod payment_type;
pub mod payroll_run;
pub mod staff;
pub mod tax_settings;
