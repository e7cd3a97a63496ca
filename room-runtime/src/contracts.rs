//! Solidity contract bindings for all on-chain interactions.
//!
//! Uses alloy's `sol!` macro to generate type-safe ABI encoders/decoders
//! for the ERC-20 token, the V2-style swap router, and the secure-room
//! registries.

use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function transfer(address to, uint256 amount) external returns (bool);
        function decimals() external view returns (uint8);
    }

    #[sol(rpc)]
    interface ISwapRouter {
        function getAmountsOut(uint256 amountIn, address[] calldata path) external view returns (uint256[] memory amounts);
        function swapExactTokensForTokens(
            uint256 amountIn,
            uint256 amountOutMin,
            address[] calldata path,
            address to,
            uint256 deadline
        ) external returns (uint256[] memory amounts);
    }

    #[sol(rpc)]
    interface IRoomRegistry {
        function getRoomAgents(uint256 roomId) external view returns (uint256[] memory tokenIds);

        event RoomCreated(uint256 indexed roomId, uint256 traderTokenId, uint256 investorTokenId);
    }

    #[sol(rpc)]
    interface IAgentRegistry {
        function getAgentType(uint256 tokenId) external view returns (uint8);
        function tokenURI(uint256 tokenId) external view returns (string memory);
    }
}
