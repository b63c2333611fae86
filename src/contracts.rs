//! Centralized Contract Definitions
//!
//! Solidity interfaces used by the sniper, defined with alloy's `sol!` macro.
//! Interfaces annotated with `#[sol(rpc)]` generate contract instance types
//! that make calls through any alloy Provider.
//!
//! Created: 2026-10-12

use alloy::sol;

// ── ERC20 ─────────────────────────────────────────────────────────────

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
    }
}

// ── Uniswap V3 SwapRouter (watched call) ─────────────────────────────

sol! {
    interface ISwapRouter {
        struct ExactOutputSingleParams {
            address tokenIn;
            address tokenOut;
            uint24 fee;
            address recipient;
            uint256 deadline;
            uint256 amountOut;
            uint256 amountInMaximum;
            uint160 sqrtPriceLimitX96;
        }

        function exactOutputSingle(ExactOutputSingleParams calldata params) external payable returns (uint256 amountIn);
    }
}

// ── Router buy entry point ───────────────────────────────────────────

sol! {
    #[sol(rpc)]
    interface IUniswapV2Router02 {
        function swapExactETHForTokens(uint256 amountOutMin, address[] calldata path, address to, uint256 deadline) external payable returns (uint256[] memory amounts);
    }
}
