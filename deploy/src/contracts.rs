use ethers::contract::abigen;

abigen!(
    NFTMarketplace,
    "compiled-contracts/NFTMarketplace.json"
);
