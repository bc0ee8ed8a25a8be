//! 组件依赖管理
//!
//! 本模块提供组件依赖关系的图结构和解析器。
//!
//! # 主要组件
//!
//! - [`DependencyGraph`] - 依赖关系图，可用于自省和工具构建
//! - [`DependencyResolver`] - 依赖解析器，校验依赖完整性并计算确定性的拓扑顺序
//!
//! # 示例
//!
//! ```rust
//! use composer_core::component::dependency::DependencyResolver;
//! use composer_core::component::metadata::ComponentInfo;
//!
//! let components = vec![
//!     ComponentInfo::new("api").with_dependencies(["cache", "db"]),
//!     ComponentInfo::new("cache").with_dependency("db"),
//!     ComponentInfo::new("db"),
//! ];
//!
//! let mut resolver = DependencyResolver::new();
//! let ordered = resolver.resolve_dependencies(&components).unwrap();
//! let names: Vec<&str> = ordered.iter().map(|c| c.name.as_str()).collect();
//! assert_eq!(names, vec!["db", "cache", "api"]);
//! ```

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::component::metadata::ComponentInfo;
use crate::utils::{CoreError, Result};

/// 组件依赖关系图
///
/// 由组件描述符派生，每次解析时整体重建，不做增量维护。
/// 依赖某个尚未加入图中的组件是允许的，[`validate`](Self::validate) 会报告这类悬空引用。
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// 节点：组件名 -> 组件描述符
    nodes: HashMap<String, ComponentInfo>,
    /// 正向边：组件名 -> 该组件依赖的组件列表
    edges: HashMap<String, Vec<String>>,
    /// 反向边：组件名 -> 依赖该组件的组件列表
    reverse_edges: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// 创建一个空的依赖图
    pub fn new() -> Self {
        Self::default()
    }

    /// 由一组组件描述符构建依赖图
    ///
    /// 不检查组件名唯一性，同名描述符以后出现者为准，依赖边会合并。
    pub fn from_components<'a, I>(components: I) -> Self
    where
        I: IntoIterator<Item = &'a ComponentInfo>,
    {
        let mut graph = Self::new();
        for component in components {
            graph.add_node(component.clone());
        }
        graph
    }

    /// 添加组件节点，并记录其声明的全部依赖边
    ///
    /// # 示例
    ///
    /// ```rust
    /// use composer_core::component::dependency::DependencyGraph;
    /// use composer_core::component::metadata::ComponentInfo;
    ///
    /// let mut graph = DependencyGraph::new();
    /// graph.add_node(ComponentInfo::new("db"));
    /// graph.add_node(ComponentInfo::new("cache").with_dependency("db"));
    ///
    /// assert_eq!(graph.get_dependencies("cache"), vec!["db".to_string()]);
    /// assert_eq!(graph.get_dependents("db"), vec!["cache".to_string()]);
    /// ```
    pub fn add_node(&mut self, info: ComponentInfo) {
        let name = info.name.clone();
        let dependencies = info.dependencies.clone();

        self.nodes.insert(name.clone(), info);
        self.edges.entry(name.clone()).or_default();
        self.reverse_edges.entry(name.clone()).or_default();

        for dependency in &dependencies {
            self.add_edge(&name, dependency);
        }
    }

    /// 添加依赖边：`from` 依赖于 `to`
    ///
    /// `from` 不存在时会创建占位节点；`to` 不会被自动创建。
    /// 重复的边只记录一次。
    pub fn add_edge(&mut self, from: &str, to: &str) {
        if !self.nodes.contains_key(from) {
            self.nodes
                .insert(from.to_string(), ComponentInfo::new(from));
        }

        let deps = self.edges.entry(from.to_string()).or_default();
        if !deps.iter().any(|d| d == to) {
            deps.push(to.to_string());
        }

        let dependents = self.reverse_edges.entry(to.to_string()).or_default();
        if !dependents.iter().any(|d| d == from) {
            dependents.push(from.to_string());
        }
    }

    /// 获取组件的直接依赖（按声明顺序）
    pub fn get_dependencies(&self, name: &str) -> Vec<String> {
        self.edges.get(name).cloned().unwrap_or_default()
    }

    /// 获取直接依赖该组件的组件（按名称排序）
    pub fn get_dependents(&self, name: &str) -> Vec<String> {
        let mut dependents = self.reverse_edges.get(name).cloned().unwrap_or_default();
        dependents.sort();
        dependents
    }

    /// 获取组件的全部传递依赖，被依赖者在前
    pub fn get_all_dependencies(&self, name: &str) -> Vec<String> {
        let mut result = Vec::new();
        let mut visited = HashSet::new();
        self.collect_dependencies(name, &mut result, &mut visited);
        result
    }

    fn collect_dependencies(
        &self,
        name: &str,
        result: &mut Vec<String>,
        visited: &mut HashSet<String>,
    ) {
        if !visited.insert(name.to_string()) {
            return;
        }

        if let Some(deps) = self.edges.get(name) {
            for dep in deps {
                self.collect_dependencies(dep, result, visited);
                if !result.contains(dep) {
                    result.push(dep.clone());
                }
            }
        }
    }

    /// 检测是否存在循环依赖
    ///
    /// ```rust
    /// use composer_core::component::dependency::DependencyGraph;
    /// use composer_core::component::metadata::ComponentInfo;
    ///
    /// let mut graph = DependencyGraph::new();
    /// graph.add_node(ComponentInfo::new("a").with_dependency("b"));
    /// graph.add_node(ComponentInfo::new("b"));
    /// assert!(!graph.has_cycle());
    ///
    /// graph.add_edge("b", "a");
    /// assert!(graph.has_cycle());
    /// ```
    pub fn has_cycle(&self) -> bool {
        self.find_cycle().is_some()
    }

    /// 查找一条循环依赖路径
    ///
    /// 深度优先搜索，按组件名顺序遍历起点，保证结果稳定。
    /// 返回的路径首尾相同，例如 `["a", "b", "a"]`。
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();
        let mut path = Vec::new();

        for node in self.node_names() {
            if let Some(cycle) =
                self.find_cycle_util(&node, &mut visited, &mut rec_stack, &mut path)
            {
                return Some(cycle);
            }
        }

        None
    }

    fn find_cycle_util(
        &self,
        node: &str,
        visited: &mut HashSet<String>,
        rec_stack: &mut HashSet<String>,
        path: &mut Vec<String>,
    ) -> Option<Vec<String>> {
        // 回边指向递归栈中的节点即成环
        if rec_stack.contains(node) {
            let start = path.iter().position(|n| n == node).unwrap_or(0);
            let mut cycle = path[start..].to_vec();
            cycle.push(node.to_string());
            return Some(cycle);
        }

        if visited.contains(node) {
            return None;
        }

        visited.insert(node.to_string());
        rec_stack.insert(node.to_string());
        path.push(node.to_string());

        if let Some(neighbors) = self.edges.get(node) {
            for neighbor in neighbors {
                if let Some(cycle) = self.find_cycle_util(neighbor, visited, rec_stack, path) {
                    return Some(cycle);
                }
            }
        }

        path.pop();
        rec_stack.remove(node);
        None
    }

    /// 校验依赖图：先检查悬空引用，再检查循环依赖
    ///
    /// # 错误
    ///
    /// - `CoreError::DependencyNotFound` - 某个依赖不在图中
    /// - `CoreError::CircularDependency` - 存在循环依赖
    pub fn validate(&self) -> Result<()> {
        for name in self.node_names() {
            for dependency in self.edges.get(&name).into_iter().flatten() {
                if !self.nodes.contains_key(dependency) {
                    return Err(CoreError::DependencyNotFound {
                        component: name.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }

        if let Some(cycle) = self.find_cycle() {
            return Err(CoreError::CircularDependency {
                component: cycle.first().cloned().unwrap_or_default(),
                cycle,
            });
        }

        Ok(())
    }

    /// 拓扑排序
    ///
    /// 保证每个组件都排在它的全部依赖之后。同时就绪的组件按名称字典序输出，
    /// 相同输入总是得到相同顺序。
    ///
    /// ```rust
    /// use composer_core::component::dependency::DependencyGraph;
    /// use composer_core::component::metadata::ComponentInfo;
    ///
    /// let mut graph = DependencyGraph::new();
    /// graph.add_node(ComponentInfo::new("web").with_dependency("auth"));
    /// graph.add_node(ComponentInfo::new("metrics"));
    /// graph.add_node(ComponentInfo::new("auth"));
    ///
    /// let order = graph.get_topological_order().unwrap();
    /// assert_eq!(order, vec!["auth", "metrics", "web"]);
    /// ```
    pub fn get_topological_order(&self) -> Result<Vec<String>> {
        self.validate()?;
        self.kahn_order()
    }

    /// 拓扑排序的逆序，用于停止和关闭阶段
    pub fn get_teardown_order(&self) -> Result<Vec<String>> {
        let mut order = self.get_topological_order()?;
        order.reverse();
        Ok(order)
    }

    /// Kahn 算法：组件的全部依赖都已输出后才就绪
    ///
    /// 就绪集合使用有序集合，弹出时总是取字典序最小者。
    fn kahn_order(&self) -> Result<Vec<String>> {
        let mut remaining: HashMap<&str, usize> = self
            .nodes
            .keys()
            .map(|name| (name.as_str(), self.edges.get(name).map_or(0, Vec::len)))
            .collect();

        let mut ready: BTreeSet<&str> = remaining
            .iter()
            .filter(|(_, &count)| count == 0)
            .map(|(name, _)| *name)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(name) = ready.pop_first() {
            order.push(name.to_string());

            for dependent in self.reverse_edges.get(name).into_iter().flatten() {
                if let Some(count) = remaining.get_mut(dependent.as_str()) {
                    if *count == 0 {
                        continue;
                    }
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(dependent.as_str());
                    }
                }
            }
        }

        if order.len() != self.nodes.len() {
            let mut unresolved: Vec<String> = remaining
                .into_iter()
                .filter(|(_, count)| *count > 0)
                .map(|(name, _)| name.to_string())
                .collect();
            unresolved.sort();
            return Err(CoreError::CircularDependency {
                component: unresolved.first().cloned().unwrap_or_default(),
                cycle: unresolved,
            });
        }

        Ok(order)
    }

    /// 获取节点描述符
    pub fn node(&self, name: &str) -> Option<&ComponentInfo> {
        self.nodes.get(name)
    }

    /// 检查是否包含指定组件
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// 获取所有组件名（按名称排序）
    pub fn node_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.nodes.keys().cloned().collect();
        names.sort();
        names
    }

    /// 节点数量
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// 图是否为空
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// 依赖解析器
///
/// 每次解析都从输入快照重建依赖图。解析是全有或全无的：
/// 任何校验失败都不返回部分顺序，也不会替换解析器持有的上一次成功结果。
#[derive(Debug, Default)]
pub struct DependencyResolver {
    graph: DependencyGraph,
}

impl DependencyResolver {
    /// 创建新的依赖解析器
    pub fn new() -> Self {
        Self::default()
    }

    /// 校验依赖完整性与无环性
    ///
    /// # 错误
    ///
    /// - `CoreError::DependencyNotFound` - 组件声明的依赖不在输入集合中，错误中同时包含组件名与依赖名
    /// - `CoreError::CircularDependency` - 深度优先搜索发现回边
    pub fn validate_dependencies(&self, components: &[ComponentInfo]) -> Result<()> {
        Self::build_validated(components).map(|_| ())
    }

    /// 解析依赖，返回按初始化顺序排列的组件描述符
    ///
    /// 依赖总是排在依赖方之前；同时就绪的组件按名称字典序排列。
    pub fn resolve_dependencies(
        &mut self,
        components: &[ComponentInfo],
    ) -> Result<Vec<ComponentInfo>> {
        let graph = Self::build_validated(components)?;

        // 环已由 DFS 排除，这里的长度检查是第二道保证
        let order = graph.kahn_order()?;

        let resolved = order
            .iter()
            .filter_map(|name| graph.node(name).cloned())
            .collect();

        self.graph = graph;
        Ok(resolved)
    }

    /// 最近一次成功解析得到的依赖图
    pub fn dependency_graph(&self) -> &DependencyGraph {
        &self.graph
    }

    fn build_validated(components: &[ComponentInfo]) -> Result<DependencyGraph> {
        let names: HashSet<&str> = components.iter().map(|c| c.name.as_str()).collect();

        for component in components {
            for dependency in &component.dependencies {
                if !names.contains(dependency.as_str()) {
                    return Err(CoreError::DependencyNotFound {
                        component: component.name.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }

        let graph = DependencyGraph::from_components(components);
        if let Some(cycle) = graph.find_cycle() {
            return Err(CoreError::CircularDependency {
                component: cycle.first().cloned().unwrap_or_default(),
                cycle,
            });
        }

        Ok(graph)
    }
}
