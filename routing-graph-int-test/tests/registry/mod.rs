mod import_test;
