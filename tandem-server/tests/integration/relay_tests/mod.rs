mod test_two_participants_over_ws;
