#![deny(clippy::expect_used, clippy::unwrap_used)]

//! 低功耗网状路由网络控制平面洪泛防御库的根。
//! The root of the control-plane flood defense library for low-power mesh
//! routing networks.
//!
//! An authenticated insider can saturate the shared medium by sending
//! route-advertisement (DAO-equivalent) control messages far above normal
//! rate. This crate implements the closed-loop defense that runs at the
//! routing tree's root: a per-source sliding-window rate observer, a
//! mitigation controller with a `Normal`/`Enforced` state machine per
//! source, and the adaptive source model it regulates through feedback
//! directives.
//!
//! 经过认证的内部节点可以以远超正常的速率发送路由通告（等同于DAO）控制消息，
//! 从而饱和共享信道。本 crate 实现了运行在路由树根节点的闭环防御：
//! 每个源的滑动窗口速率观察器、带有 `Normal`/`Enforced` 状态机的缓解控制器，
//! 以及它通过反馈指令调控的自适应源模型。

pub mod config;
pub mod error;
pub mod events;
pub mod message;
pub mod mitigation;
pub mod rate;
pub mod root;
pub mod source;
pub mod window;
