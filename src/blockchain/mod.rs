pub mod eth_client;
