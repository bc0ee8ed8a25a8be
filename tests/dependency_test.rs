//! 依赖解析性质测试
//!
//! 在一批确定性生成的有向无环图上检查排序结果。

use std::collections::HashMap;

use composer_core::{ComponentInfo, CoreError, DependencyGraph, DependencyResolver};

/// 线性同余生成器，保证每次运行生成相同的图
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

/// 生成 `size` 个组件，组件 i 只依赖编号更小的组件，保证无环
///
/// 名称带随机前缀，使字典序与生成顺序无关。
fn generate_dag(seed: u64, size: usize) -> Vec<ComponentInfo> {
    let mut rng = Lcg(seed);
    let mut components: Vec<ComponentInfo> = Vec::with_capacity(size);

    for i in 0..size {
        let mut info = ComponentInfo::new(format!("n{}-{}", rng.below(7), i));
        if i > 0 {
            for _ in 0..rng.below(4) {
                let target = components[rng.below(i as u64) as usize].name.clone();
                if !info.depends_on(&target) {
                    info.dependencies.push(target);
                }
            }
        }
        components.push(info);
    }

    components
}

fn names(order: &[ComponentInfo]) -> Vec<String> {
    order.iter().map(|c| c.name.clone()).collect()
}

fn assert_dependencies_first(components: &[ComponentInfo], order: &[ComponentInfo]) {
    let position: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(i, c)| (c.name.as_str(), i))
        .collect();

    assert_eq!(position.len(), components.len());
    for component in components {
        let own = position[component.name.as_str()];
        for dep in &component.dependencies {
            assert!(
                position[dep.as_str()] < own,
                "{} 应排在 {} 之前",
                dep,
                component.name
            );
        }
    }
}

#[test]
fn test_generated_dags_respect_dependencies() {
    for seed in 1..=40 {
        let components = generate_dag(seed, 25);
        let mut resolver = DependencyResolver::new();
        let order = resolver.resolve_dependencies(&components).unwrap();
        assert_dependencies_first(&components, &order);
        assert_eq!(resolver.dependency_graph().len(), components.len());
    }
}

#[test]
fn test_order_independent_of_input_order() {
    for seed in 1..=20 {
        let components = generate_dag(seed, 30);
        let expected = names(&DependencyResolver::new().resolve_dependencies(&components).unwrap());

        let mut reversed = components.clone();
        reversed.reverse();
        let mut rotated = components.clone();
        rotated.rotate_left(seed as usize % components.len());

        for input in [reversed, rotated] {
            let order = DependencyResolver::new().resolve_dependencies(&input).unwrap();
            assert_eq!(names(&order), expected);
        }
    }
}

#[test]
fn test_independent_components_sorted_by_name() {
    let components: Vec<ComponentInfo> = ["pear", "apple", "fig", "banana"]
        .into_iter()
        .map(ComponentInfo::new)
        .collect();
    let order = DependencyResolver::new().resolve_dependencies(&components).unwrap();
    assert_eq!(names(&order), vec!["apple", "banana", "fig", "pear"]);
}

#[test]
fn test_diamond() {
    let components = vec![
        ComponentInfo::new("top").with_dependencies(["left", "right"]),
        ComponentInfo::new("right").with_dependency("base"),
        ComponentInfo::new("left").with_dependency("base"),
        ComponentInfo::new("base"),
    ];
    let order = DependencyResolver::new().resolve_dependencies(&components).unwrap();
    assert_eq!(names(&order), vec!["base", "left", "right", "top"]);
}

#[test]
fn test_resolution_returns_descriptors_unchanged() {
    let components = vec![
        ComponentInfo::new("cache").with_dependency("db"),
        ComponentInfo::new("db"),
    ];
    let order = DependencyResolver::new().resolve_dependencies(&components).unwrap();
    assert_eq!(order[1].name, "cache");
    assert_eq!(order[1].dependencies, vec!["db".to_string()]);
}

#[test]
fn test_cycle_in_generated_dag() {
    let mut components = generate_dag(7, 15);
    // 首尾互相依赖
    let last_index = components.len() - 1;
    let last = components[last_index].name.clone();
    let first = components[0].name.clone();
    components[0].dependencies.push(last);
    if !components[last_index].dependencies.contains(&first) {
        components[last_index].dependencies.push(first);
    }

    let err = DependencyResolver::new()
        .resolve_dependencies(&components)
        .unwrap_err();
    match err {
        CoreError::CircularDependency { cycle, .. } => {
            assert!(cycle.len() >= 3);
            assert_eq!(cycle.first(), cycle.last());
        }
        other => panic!("期望 CircularDependency，实际: {:?}", other),
    }
}

#[test]
fn test_failed_resolution_keeps_previous_graph() {
    let mut resolver = DependencyResolver::new();
    resolver
        .resolve_dependencies(&[ComponentInfo::new("db")])
        .unwrap();

    let result = resolver.resolve_dependencies(&[ComponentInfo::new("api").with_dependency("ghost")]);
    assert!(matches!(result, Err(CoreError::DependencyNotFound { .. })));
    assert!(resolver.dependency_graph().contains("db"));
    assert!(!resolver.dependency_graph().contains("api"));
}

#[test]
fn test_graph_queries() {
    let components = vec![
        ComponentInfo::new("api").with_dependencies(["cache", "db"]),
        ComponentInfo::new("cache").with_dependency("db"),
        ComponentInfo::new("db"),
    ];
    let graph = DependencyGraph::from_components(&components);

    assert_eq!(graph.get_dependents("db"), vec!["api".to_string(), "cache".to_string()]);
    let mut all = graph.get_all_dependencies("api");
    all.sort();
    assert_eq!(all, vec!["cache".to_string(), "db".to_string()]);
    assert_eq!(
        graph.get_teardown_order().unwrap(),
        vec!["api".to_string(), "cache".to_string(), "db".to_string()]
    );
}

#[test]
fn test_empty_input() {
    let mut resolver = DependencyResolver::new();
    assert!(resolver.resolve_dependencies(&[]).unwrap().is_empty());
    assert!(resolver.dependency_graph().is_empty());
}
