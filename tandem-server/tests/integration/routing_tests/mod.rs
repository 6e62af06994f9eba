mod test_route_stamps_sender;
mod test_route_to_absent_participant;
