pub mod amortization;
pub mod pay_later;
pub mod scoring;
