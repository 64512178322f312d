mod database_shape_test;
mod scenario_test;
