mod test_channel_lost_ends_session;
mod test_relay_unreachable_at_join;
mod test_transport_recovers_in_place;
