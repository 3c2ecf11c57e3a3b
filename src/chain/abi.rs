//! Contract interfaces.
//!
//! Reward accrual, fee application and referral payouts all live inside the
//! staking contract; this client only reads its views and submits its three
//! write entrypoints. Swaps and liquidity go through the PancakeSwap V2
//! router.

use alloy_sol_types::sol;

sol! {
    /// KIND/HUG LP staking contract.
    interface IStaking {
        struct Plan {
            uint256 minUSD;
            uint256 monthlyRateBps;
        }

        struct Position {
            uint256 pid;
            uint256 lpAmount;
            uint256 stakeUSD;
            uint256 planId;
            uint256 startTime;
            uint256 endTime;
            bool closed;
            uint256 lastClaimTime;
            uint256 endTimeAtClose;
        }

        function getPlans() external view returns (Plan[] memory);
        function poolStats(uint256 pid) external view returns (
            uint256 totalStakedLP,
            uint256 totalStakedUSD,
            uint256 totalBurnedToken,
            uint256 totalBNBToDev
        );
        function positionsOf(address user) external view returns (uint256[] memory);
        function positionInfo(uint256 id) external view returns (
            Position memory pos,
            uint256 claimableUSD,
            uint256 claimableReward
        );
        function referralEarnings(address user) external view returns (uint256);
        function positionCounter() external view returns (uint256);

        function stake(uint256 pid, uint256 amount, uint256 planId, address referrer) external;
        function claim(uint256 positionId) external;
        function unstake(uint256 positionId) external;
    }

    interface IPancakePair {
        function getReserves() external view returns (
            uint112 reserve0,
            uint112 reserve1,
            uint32 blockTimestampLast
        );
        function token0() external view returns (address);
        function token1() external view returns (address);
    }

    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function decimals() external view returns (uint8);
        function approve(address spender, uint256 amount) external returns (bool);
    }

    interface IPancakeRouter {
        function getAmountsOut(uint256 amountIn, address[] memory path)
            external view returns (uint256[] memory amounts);
        function swapExactTokensForTokens(
            uint256 amountIn,
            uint256 amountOutMin,
            address[] calldata path,
            address to,
            uint256 deadline
        ) external returns (uint256[] memory amounts);
        function swapExactETHForTokens(
            uint256 amountOutMin,
            address[] calldata path,
            address to,
            uint256 deadline
        ) external payable returns (uint256[] memory amounts);
        function addLiquidityETH(
            address token,
            uint256 amountTokenDesired,
            uint256 amountTokenMin,
            uint256 amountETHMin,
            address to,
            uint256 deadline
        ) external payable returns (uint256 amountToken, uint256 amountETH, uint256 liquidity);
    }
}
