mod test_join_failures;
mod test_transport_states;
