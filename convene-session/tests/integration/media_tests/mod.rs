mod test_media_failure_joins_receive_only;
mod test_mute_reaches_remote_link;
mod test_screen_share_round_trip;
