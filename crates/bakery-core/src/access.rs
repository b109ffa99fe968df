//! 操作者與權限檢查
//!
//! 每個公開的變更操作在開頭呼叫一次 [`authorize`]。

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{BakeryError, Result};

/// 角色（Admin 權限最高）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Manager,
    Baker,
    Sales,
    Viewer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// 操作者（稽核歸屬）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub name: String,
    pub role: Role,
}

impl Actor {
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }

    /// 系統內部操作者
    pub fn system() -> Self {
        Self::new("system", Role::Admin)
    }

    pub fn is_most_privileged(&self) -> bool {
        self.role == Role::Admin
    }
}

/// 受控操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    AdjustStock,
    ReceivePurchase,
    ApproveCount,
    ReturnToSupplier,
    ReportDamage,
    ManageCatalog,
    ManageBom,
    CreateWorkOrders,
    TransitionWorkOrder,
    ReportProduction,
    CreateOrder,
    EditOrder,
    TransitionOrder,
    LockOrder,
    UnlockOrder,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// 資源狀態（與權限判斷相關的部分）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResourceState {
    #[default]
    None,
    Order {
        locked: bool,
    },
}

impl Action {
    /// 允許執行的角色
    pub fn allowed_roles(&self) -> &'static [Role] {
        use Role::*;
        match self {
            Action::AdjustStock
            | Action::ReceivePurchase
            | Action::ApproveCount
            | Action::ReturnToSupplier
            | Action::ManageCatalog
            | Action::ManageBom
            | Action::CreateWorkOrders
            | Action::TransitionWorkOrder
            | Action::LockOrder => &[Admin, Manager],
            Action::ReportDamage | Action::ReportProduction => &[Admin, Manager, Baker],
            Action::CreateOrder | Action::EditOrder | Action::TransitionOrder => {
                &[Admin, Manager, Sales]
            }
            Action::UnlockOrder => &[Admin],
        }
    }
}

/// 權限檢查：角色矩陣 + 鎖定訂單的內容修改限制
pub fn authorize(actor: &Actor, action: Action, state: ResourceState) -> Result<()> {
    if !action.allowed_roles().contains(&actor.role) {
        return Err(BakeryError::Forbidden {
            role: actor.role.to_string(),
            action: action.to_string(),
        });
    }

    if let (Action::EditOrder, ResourceState::Order { locked: true }) = (action, state) {
        if !actor.is_most_privileged() {
            return Err(BakeryError::LockedResource(format!(
                "訂單已鎖定，{} 無法修改內容",
                actor.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Role::Admin, Action::UnlockOrder, true)]
    #[case(Role::Manager, Action::UnlockOrder, false)]
    #[case(Role::Manager, Action::LockOrder, true)]
    #[case(Role::Sales, Action::LockOrder, false)]
    #[case(Role::Baker, Action::ReportProduction, true)]
    #[case(Role::Baker, Action::AdjustStock, false)]
    #[case(Role::Sales, Action::CreateOrder, true)]
    #[case(Role::Viewer, Action::CreateOrder, false)]
    #[case(Role::Baker, Action::ReportDamage, true)]
    fn test_role_matrix(#[case] role: Role, #[case] action: Action, #[case] allowed: bool) {
        let actor = Actor::new("someone", role);
        assert_eq!(
            authorize(&actor, action, ResourceState::None).is_ok(),
            allowed
        );
    }

    #[test]
    fn test_locked_order_edit_requires_admin() {
        let manager = Actor::new("mgr", Role::Manager);
        let admin = Actor::new("root", Role::Admin);
        let locked = ResourceState::Order { locked: true };

        assert!(matches!(
            authorize(&manager, Action::EditOrder, locked),
            Err(BakeryError::LockedResource(_))
        ));
        assert!(authorize(&admin, Action::EditOrder, locked).is_ok());
        assert!(authorize(&manager, Action::EditOrder, ResourceState::Order { locked: false }).is_ok());
    }
}
