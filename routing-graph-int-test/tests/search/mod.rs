mod linear_scan_test;
mod nearest_node_test;
