pub mod disruption;
