pub mod tarefa;
