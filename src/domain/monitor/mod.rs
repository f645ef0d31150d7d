pub mod congestion_monitor;
