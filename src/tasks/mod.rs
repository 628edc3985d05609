pub mod expiry_scan;
